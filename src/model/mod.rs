//! Document and principal schemas
//!
//! Defines the stored structures for forms, travelers, binders, users and
//! groups, plus the ACL block and share entries they embed.

mod acl;
mod binder;
mod document;
mod form;
mod principal;
mod share;
mod status;
mod traveler;

pub use acl::AccessControl;
pub use binder::{
    Binder, WorkColor, WorkItem, WorkRef, BINDER_COLLECTION, DEFAULT_WORK_PRIORITY,
    DEFAULT_WORK_VALUE, MAX_WORK_PRIORITY, MIN_WORK_PRIORITY,
};
pub use document::{DocKind, Document, Shareable};
pub use form::{Form, FORM_COLLECTION};
pub use principal::{BackRefs, GroupDoc, PrincipalKind, UserDoc, GROUP_COLLECTION, USER_COLLECTION};
pub use share::{AccessLevel, ShareList, SharedEntry};
pub use status::{BinderStatus, FormStatus, TravelerStatus};
pub use traveler::{Traveler, TRAVELER_COLLECTION};
