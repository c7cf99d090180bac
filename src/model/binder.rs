//! Binder document and its work items
//!
//! A binder aggregates travelers and nested binders. Each child is tracked by
//! a [`WorkItem`] carrying a cached progress snapshot:
//!
//! - `finished` is the fraction of the child's value that is completed
//! - `inProgress` is the fraction that is still being worked on
//!
//! The binder totals are value-weighted sums over its work items:
//! `totalValue = Σ value`, `finishedValue = Σ value × finished`,
//! `inProgressValue = Σ value × inProgress`.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::acl::AccessControl;
use super::share::AccessLevel;
use super::status::BinderStatus;

/// Collection name for binders
pub const BINDER_COLLECTION: &str = "binders";

pub const DEFAULT_WORK_VALUE: f64 = 10.0;
pub const DEFAULT_WORK_PRIORITY: u8 = 5;
pub const MIN_WORK_PRIORITY: u8 = 1;
pub const MAX_WORK_PRIORITY: u8 = 10;

/// Kind of entity a work item refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkRef {
    Traveler,
    Binder,
}

impl fmt::Display for WorkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkRef::Traveler => write!(f, "traveler"),
            WorkRef::Binder => write!(f, "binder"),
        }
    }
}

/// Display color of a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkColor {
    Green,
    Yellow,
    Red,
    #[default]
    Blue,
    Black,
}

/// A binder's reference to a child traveler or binder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    /// Id of the referenced traveler or binder
    #[serde(rename = "_id")]
    pub id: ObjectId,

    #[serde(default)]
    pub alias: String,

    pub ref_type: WorkRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_on: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,

    /// Raw status code of the child at the last refresh
    #[serde(default)]
    pub status: f64,

    #[serde(default)]
    pub finished: f64,

    #[serde(default)]
    pub in_progress: f64,

    #[serde(default = "default_priority")]
    pub priority: u8,

    #[serde(default = "default_sequence")]
    pub sequence: u32,

    #[serde(default = "default_value")]
    pub value: f64,

    #[serde(default)]
    pub color: WorkColor,
}

fn default_priority() -> u8 {
    DEFAULT_WORK_PRIORITY
}

fn default_sequence() -> u32 {
    1
}

fn default_value() -> f64 {
    DEFAULT_WORK_VALUE
}

impl WorkItem {
    pub fn new(id: ObjectId, ref_type: WorkRef) -> Self {
        Self {
            id,
            alias: String::new(),
            ref_type,
            added_on: None,
            added_by: None,
            status: 0.0,
            finished: 0.0,
            in_progress: 0.0,
            priority: DEFAULT_WORK_PRIORITY,
            sequence: 1,
            value: DEFAULT_WORK_VALUE,
            color: WorkColor::default(),
        }
    }
}

/// Aggregated work package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binder {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: BinderStatus,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,

    #[serde(default)]
    pub works: Vec<WorkItem>,

    #[serde(default)]
    pub total_value: f64,

    #[serde(default)]
    pub finished_value: f64,

    #[serde(default)]
    pub in_progress_value: f64,

    #[serde(flatten)]
    pub acl: AccessControl,
}

impl Binder {
    pub fn new(title: impl Into<String>, description: impl Into<String>, created_by: &str) -> Self {
        Self {
            id: ObjectId::new(),
            title: title.into(),
            description: description.into(),
            status: BinderStatus::New,
            tags: Vec::new(),
            deadline: None,
            works: Vec::new(),
            total_value: 0.0,
            finished_value: 0.0,
            in_progress_value: 0.0,
            acl: AccessControl::new(created_by, AccessLevel::Read),
        }
    }

    pub fn work(&self, id: &ObjectId) -> Option<&WorkItem> {
        self.works.iter().find(|w| &w.id == id)
    }

    pub fn work_mut(&mut self, id: &ObjectId) -> Option<&mut WorkItem> {
        self.works.iter_mut().find(|w| &w.id == id)
    }
}
