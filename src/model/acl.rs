//! Access-control block shared by forms, travelers and binders
//!
//! Flattened into each document so the stored layout keeps the fields at
//! the top level (`createdBy`, `owner`, `publicAccess`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::share::{AccessLevel, ShareList, SharedEntry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessControl {
    /// Principal that created the document
    #[serde(default)]
    pub created_by: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,

    /// Ownership transfer target; when unset the creator owns the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transferred_on: Option<DateTime<Utc>>,

    /// Records written before the field existed read as private
    #[serde(default)]
    pub public_access: AccessLevel,

    #[serde(default)]
    pub shared_with: Vec<SharedEntry>,

    #[serde(default)]
    pub shared_group: Vec<SharedEntry>,

    #[serde(default)]
    pub archived: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_on: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<DateTime<Utc>>,
}

impl AccessControl {
    /// ACL for a freshly created document
    pub fn new(created_by: impl Into<String>, public_access: AccessLevel) -> Self {
        Self {
            created_by: created_by.into(),
            created_on: Some(Utc::now()),
            owner: None,
            transferred_on: None,
            public_access,
            shared_with: Vec::new(),
            shared_group: Vec::new(),
            archived: false,
            archived_on: None,
            updated_by: None,
            updated_on: None,
        }
    }

    /// The de-facto owner: `owner` if set, otherwise the creator
    pub fn effective_owner(&self) -> &str {
        self.owner.as_deref().unwrap_or(&self.created_by)
    }

    pub fn list(&self, list: ShareList) -> &[SharedEntry] {
        match list {
            ShareList::Users => &self.shared_with,
            ShareList::Groups => &self.shared_group,
        }
    }

    pub fn list_mut(&mut self, list: ShareList) -> &mut Vec<SharedEntry> {
        match list {
            ShareList::Users => &mut self.shared_with,
            ShareList::Groups => &mut self.shared_group,
        }
    }

    /// Find the entry for a principal id in one of the share lists
    pub fn entry(&self, list: ShareList, id: &str) -> Option<&SharedEntry> {
        self.list(list).iter().find(|e| e.id == id)
    }

    pub fn entry_mut(&mut self, list: ShareList, id: &str) -> Option<&mut SharedEntry> {
        self.list_mut(list).iter_mut().find(|e| e.id == id)
    }

    /// Stamp the last-modification fields
    pub fn touch(&mut self, by: &str) {
        self.updated_by = Some(by.to_string());
        self.updated_on = Some(Utc::now());
    }
}
