//! Form template document

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::acl::AccessControl;
use super::share::AccessLevel;
use super::status::FormStatus;

/// Collection name for forms
pub const FORM_COLLECTION: &str = "forms";

/// Reusable HTML field template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub status: FormStatus,

    #[serde(default)]
    pub html: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloned_from: Option<ObjectId>,

    #[serde(flatten)]
    pub acl: AccessControl,
}

impl Form {
    /// New editable form; forms are private until shared
    pub fn new(title: impl Into<String>, html: impl Into<String>, created_by: &str) -> Self {
        Self {
            id: ObjectId::new(),
            title: title.into(),
            status: FormStatus::Editable,
            html: html.into(),
            cloned_from: None,
            acl: AccessControl::new(created_by, AccessLevel::NoAccess),
        }
    }
}
