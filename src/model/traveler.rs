//! Traveler work-record document

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::acl::AccessControl;
use super::share::AccessLevel;
use super::status::TravelerStatus;

/// Collection name for travelers
pub const TRAVELER_COLLECTION: &str = "travelers";

/// Per-task work record instantiated from a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traveler {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: TravelerStatus,

    #[serde(default)]
    pub devices: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_form: Option<ObjectId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,

    /// Number of input fields in the active form
    #[serde(default)]
    pub total_input: u32,

    /// Number of input fields that have received data
    #[serde(default)]
    pub finished_input: u32,

    #[serde(flatten)]
    pub acl: AccessControl,
}

impl Traveler {
    pub fn new(title: impl Into<String>, created_by: &str, total_input: u32) -> Self {
        Self {
            id: ObjectId::new(),
            title: title.into(),
            description: String::new(),
            status: TravelerStatus::Initialized,
            devices: Vec::new(),
            reference_form: None,
            deadline: None,
            total_input,
            finished_input: 0,
            acl: AccessControl::new(created_by, AccessLevel::Read),
        }
    }
}
