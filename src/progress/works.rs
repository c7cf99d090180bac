//! Binder work-list operations

use bson::oid::ObjectId;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::{recompute_binder_totals, update_work_progress, WorkSnapshot};
use crate::access::{require_read, require_status, require_write, Principal};
use crate::model::{
    Binder, Document, Traveler, WorkColor, WorkItem, WorkRef, MAX_WORK_PRIORITY,
    MIN_WORK_PRIORITY,
};
use crate::store::DocumentStore;
use crate::types::{Result, TravelerError};

/// Binder statuses in which the work list may change
const OPEN_BINDER: &[f64] = &[0.0, 1.0];

/// Traveler statuses in which input progress may be recorded
const ACCEPTING_INPUT: &[f64] = &[1.0, 1.5, 2.0];

/// Partial update of one work item's presentation fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkUpdate {
    pub alias: Option<String>,
    pub priority: Option<u8>,
    pub sequence: Option<u32>,
    pub value: Option<f64>,
    pub color: Option<WorkColor>,
}

impl WorkUpdate {
    fn validate(&self, id: &ObjectId) -> Result<()> {
        if let Some(p) = self.priority {
            if !(MIN_WORK_PRIORITY..=MAX_WORK_PRIORITY).contains(&p) {
                return Err(TravelerError::BadRequest(format!(
                    "work {} priority {} is out of range {}..={}",
                    id, p, MIN_WORK_PRIORITY, MAX_WORK_PRIORITY
                )));
            }
        }
        if self.sequence == Some(0) {
            return Err(TravelerError::BadRequest(format!(
                "work {} sequence must be at least 1",
                id
            )));
        }
        if let Some(v) = self.value {
            if !v.is_finite() || v < 0.0 {
                return Err(TravelerError::BadRequest(format!(
                    "work {} value {} must be a non-negative number",
                    id, v
                )));
            }
        }
        Ok(())
    }

    /// Apply to a work item; returns (changed, value_changed)
    fn apply(&self, work: &mut WorkItem) -> (bool, bool) {
        let mut changed = false;
        let mut value_changed = false;
        if let Some(alias) = &self.alias {
            if &work.alias != alias {
                work.alias = alias.clone();
                changed = true;
            }
        }
        if let Some(p) = self.priority {
            if work.priority != p {
                work.priority = p;
                changed = true;
            }
        }
        if let Some(s) = self.sequence {
            if work.sequence != s {
                work.sequence = s;
                changed = true;
            }
        }
        if let Some(v) = self.value {
            if work.value != v {
                work.value = v;
                changed = true;
                value_changed = true;
            }
        }
        if let Some(c) = self.color {
            if work.color != c {
                work.color = c;
                changed = true;
            }
        }
        (changed, value_changed)
    }
}

/// A work item merged with the child's current progress fields
#[derive(Debug, Clone, PartialEq)]
pub struct WorkView {
    pub work: WorkItem,
    pub snapshot: WorkSnapshot,
}

/// Loads children and persists binders for the work-list operations
#[derive(Clone)]
pub struct WorkManager {
    documents: Arc<dyn DocumentStore>,
}

impl WorkManager {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    async fn save_binder(&self, binder: &Binder) -> Result<()> {
        self.documents.save(&Document::Binder(binder.clone())).await
    }

    async fn snapshots(&self, ref_type: WorkRef, ids: &[ObjectId]) -> Result<Vec<(WorkSnapshot, String)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(match ref_type {
            WorkRef::Traveler => self
                .documents
                .find_travelers(ids)
                .await?
                .iter()
                .map(|t| (WorkSnapshot::from(t), t.title.clone()))
                .collect(),
            WorkRef::Binder => self
                .documents
                .find_binders(ids)
                .await?
                .iter()
                .map(|b| (WorkSnapshot::from(b), b.title.clone()))
                .collect(),
        })
    }

    /// Add travelers or binders as works, returning the ids actually added.
    ///
    /// The binder itself and children already present are skipped. Nothing
    /// is saved when no work was added.
    pub async fn add_works(
        &self,
        binder: &mut Binder,
        ref_type: WorkRef,
        ids: &[ObjectId],
        principal: &Principal,
    ) -> Result<Vec<ObjectId>> {
        require_write(principal, &*binder)?;
        require_status(&*binder, OPEN_BINDER)?;

        let mut added = Vec::new();
        for (snapshot, title) in self.snapshots(ref_type, ids).await? {
            let id = snapshot.id();
            if ref_type == WorkRef::Binder && id == binder.id {
                debug!(binder = %binder.id, "binder cannot contain itself");
                continue;
            }
            if binder.work(&id).is_some() {
                continue;
            }
            let mut work = WorkItem::new(id, ref_type);
            work.alias = title;
            work.added_on = Some(Utc::now());
            work.added_by = Some(principal.id.clone());
            update_work_progress(&mut work, &snapshot);
            binder.works.push(work);
            added.push(id);
        }

        if added.is_empty() {
            return Ok(added);
        }

        binder.acl.touch(&principal.id);
        recompute_binder_totals(binder);
        self.save_binder(binder).await?;
        info!(binder = %binder.id, count = added.len(), ref_type = %ref_type, "works added");
        Ok(added)
    }

    pub async fn remove_work(
        &self,
        binder: &mut Binder,
        work_id: &ObjectId,
        principal: &Principal,
    ) -> Result<()> {
        require_write(principal, &*binder)?;
        require_status(&*binder, OPEN_BINDER)?;

        let pos = binder
            .works
            .iter()
            .position(|w| &w.id == work_id)
            .ok_or_else(|| {
                TravelerError::Missing(format!("work {} in binder {}", work_id, binder.id))
            })?;
        binder.works.remove(pos);
        binder.acl.touch(&principal.id);
        recompute_binder_totals(binder);
        self.save_binder(binder).await?;
        info!(binder = %binder.id, work = %work_id, "work removed");
        Ok(())
    }

    /// Apply per-work updates. Unknown work ids are skipped.
    ///
    /// Returns whether the binder changed and was saved.
    pub async fn update_works(
        &self,
        binder: &mut Binder,
        updates: &[(ObjectId, WorkUpdate)],
        principal: &Principal,
    ) -> Result<bool> {
        require_write(principal, &*binder)?;
        require_status(&*binder, OPEN_BINDER)?;
        for (id, update) in updates {
            update.validate(id)?;
        }

        let mut changed = false;
        let mut value_changed = false;
        for (id, update) in updates {
            let Some(work) = binder.work_mut(id) else {
                debug!(binder = %binder.id, work = %id, "skipping update for unknown work");
                continue;
            };
            let (c, v) = update.apply(work);
            changed |= c;
            value_changed |= v;
        }

        if !changed {
            return Ok(false);
        }
        if value_changed {
            recompute_binder_totals(binder);
        }
        self.save_binder(binder).await?;
        Ok(true)
    }

    /// Refresh every work's progress from its child and return merged views.
    ///
    /// The binder is saved only when a work or a total actually changed.
    /// Works whose child no longer exists are left as they are.
    pub async fn refresh_works(
        &self,
        binder: &mut Binder,
        principal: &Principal,
    ) -> Result<Vec<WorkView>> {
        require_read(principal, &*binder)?;

        let ids_of = |ref_type: WorkRef| -> Vec<ObjectId> {
            binder
                .works
                .iter()
                .filter(|w| w.ref_type == ref_type)
                .map(|w| w.id)
                .collect()
        };
        let travelers = ids_of(WorkRef::Traveler);
        let binders = ids_of(WorkRef::Binder);

        let mut snapshots = self.snapshots(WorkRef::Traveler, &travelers).await?;
        snapshots.extend(self.snapshots(WorkRef::Binder, &binders).await?);

        let before = binder.works.clone();
        let mut views = Vec::with_capacity(snapshots.len());
        for (snapshot, _) in snapshots {
            if let Some(work) = binder.work_mut(&snapshot.id()) {
                update_work_progress(work, &snapshot);
                views.push(WorkView {
                    work: work.clone(),
                    snapshot,
                });
            }
        }

        let totals_changed = recompute_binder_totals(binder);
        if totals_changed || binder.works != before {
            self.save_binder(binder).await?;
            debug!(binder = %binder.id, "binder progress refreshed");
        }
        Ok(views)
    }

    /// Record how many of a traveler's inputs have data
    pub async fn set_finished_input(
        &self,
        traveler: &mut Traveler,
        finished_input: u32,
        principal: &Principal,
    ) -> Result<bool> {
        require_write(principal, &*traveler)?;
        require_status(&*traveler, ACCEPTING_INPUT)?;
        if finished_input > traveler.total_input {
            return Err(TravelerError::BadRequest(format!(
                "finished input {} exceeds total input {}",
                finished_input, traveler.total_input
            )));
        }
        if traveler.finished_input == finished_input {
            return Ok(false);
        }
        traveler.finished_input = finished_input;
        traveler.acl.touch(&principal.id);
        self.documents
            .save(&Document::Traveler(traveler.clone()))
            .await?;
        Ok(true)
    }
}
