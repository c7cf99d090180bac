//! Status lifecycles for forms, travelers and binders
//!
//! Each status enum declares its legal edges. A requested change is checked
//! in order: an unknown code is `InvalidStatus`, the current status is an
//! idempotent no-op, and any pair outside the edge set is
//! `InvalidTransition`.
//!
//! The `set_*_status` functions apply the document-level guards and mutate
//! the document in place; callers persist it when the result is
//! [`Transition::Changed`].

use std::fmt;
use tracing::info;

use crate::access::{require_archived, require_owner, require_write, Principal};
use crate::model::{Binder, BinderStatus, Form, FormStatus, Traveler, TravelerStatus};
use crate::types::{Result, TravelerError};

/// A status enum with a fixed set of legal transitions
pub trait Lifecycle: Copy + PartialEq + fmt::Display + Sized + 'static {
    /// Legal `(from, to)` pairs
    const EDGES: &'static [(Self, Self)];

    fn parse(code: f64) -> Option<Self>;

    fn value(self) -> f64;

    fn can_transition(self, to: Self) -> bool {
        Self::EDGES.contains(&(self, to))
    }
}

impl Lifecycle for FormStatus {
    const EDGES: &'static [(Self, Self)] = &[
        (FormStatus::Editable, FormStatus::Ready),
        (FormStatus::Ready, FormStatus::Published),
        (FormStatus::Published, FormStatus::Obsolete),
        (FormStatus::Ready, FormStatus::Editable),
    ];

    fn parse(code: f64) -> Option<Self> {
        FormStatus::from_code(code)
    }

    fn value(self) -> f64 {
        self.code()
    }
}

impl Lifecycle for TravelerStatus {
    const EDGES: &'static [(Self, Self)] = &[
        (TravelerStatus::Initialized, TravelerStatus::Active),
        (TravelerStatus::Active, TravelerStatus::SubmittedForCompletion),
        (TravelerStatus::SubmittedForCompletion, TravelerStatus::Completed),
        (TravelerStatus::Active, TravelerStatus::Frozen),
        (TravelerStatus::SubmittedForCompletion, TravelerStatus::Active),
        (TravelerStatus::Frozen, TravelerStatus::Active),
    ];

    fn parse(code: f64) -> Option<Self> {
        TravelerStatus::from_code(code)
    }

    fn value(self) -> f64 {
        self.code()
    }
}

impl Lifecycle for BinderStatus {
    const EDGES: &'static [(Self, Self)] = &[
        (BinderStatus::New, BinderStatus::Active),
        (BinderStatus::Active, BinderStatus::Completed),
        (BinderStatus::Completed, BinderStatus::Active),
    ];

    fn parse(code: f64) -> Option<Self> {
        BinderStatus::from_code(code)
    }

    fn value(self) -> f64 {
        self.code()
    }
}

/// Outcome of a validated status request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition<S> {
    /// Requested status equals the current one
    Unchanged(S),
    Changed { from: S, to: S },
}

impl<S: Copy> Transition<S> {
    pub fn is_changed(&self) -> bool {
        matches!(self, Transition::Changed { .. })
    }

    /// Status after the transition
    pub fn status(&self) -> S {
        match *self {
            Transition::Unchanged(s) => s,
            Transition::Changed { to, .. } => to,
        }
    }
}

/// Validate a change from `current` to the status with code `target`
pub fn transition<S: Lifecycle>(current: S, target: f64) -> Result<Transition<S>> {
    let to = S::parse(target).ok_or_else(|| TravelerError::InvalidStatus(target.to_string()))?;
    if to == current {
        return Ok(Transition::Unchanged(current));
    }
    if !current.can_transition(to) {
        return Err(TravelerError::InvalidTransition {
            from: current.value(),
            to: target,
        });
    }
    Ok(Transition::Changed { from: current, to })
}

/// Owner-only form status change
pub fn set_form_status(
    form: &mut Form,
    target: f64,
    principal: &Principal,
) -> Result<Transition<FormStatus>> {
    require_owner(principal, &*form)?;
    let t = transition(form.status, target)?;
    if let Transition::Changed { from, to } = t {
        form.status = to;
        info!(form = %form.id, %from, %to, "form status changed");
    }
    Ok(t)
}

/// Traveler status change.
///
/// Requires write access on a live traveler. Submitting for completion is
/// open to any writer; every other change also requires ownership.
pub fn set_traveler_status(
    traveler: &mut Traveler,
    target: f64,
    principal: &Principal,
) -> Result<Transition<TravelerStatus>> {
    require_write(principal, &*traveler)?;
    require_archived(&*traveler, false)?;

    let requested = TravelerStatus::parse(target)
        .ok_or_else(|| TravelerError::InvalidStatus(target.to_string()))?;
    if requested == traveler.status {
        return Ok(Transition::Unchanged(traveler.status));
    }
    if requested != TravelerStatus::SubmittedForCompletion {
        require_owner(principal, &*traveler)?;
    }

    let t = transition(traveler.status, target)?;
    if let Transition::Changed { from, to } = t {
        traveler.status = to;
        traveler.acl.touch(&principal.id);
        info!(traveler = %traveler.id, %from, %to, by = %principal.id, "traveler status changed");
    }
    Ok(t)
}

/// Owner-only binder status change
pub fn set_binder_status(
    binder: &mut Binder,
    target: f64,
    principal: &Principal,
) -> Result<Transition<BinderStatus>> {
    require_owner(principal, &*binder)?;
    let t = transition(binder.status, target)?;
    if let Transition::Changed { from, to } = t {
        binder.status = to;
        info!(binder = %binder.id, %from, %to, "binder status changed");
    }
    Ok(t)
}
