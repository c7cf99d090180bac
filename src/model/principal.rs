//! User and group records in the local principal store
//!
//! Records are created lazily: users on first login or when a directory
//! lookup resolves a share target, groups when a directory group is shared.
//! The `forms`/`travelers`/`binders` sets are back-references to documents
//! shared with the principal and are maintained best-effort.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::DocKind;
use super::share::ShareList;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Collection name for groups
pub const GROUP_COLLECTION: &str = "groups";

/// Kind of principal a share entry or back-reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Group,
}

impl From<ShareList> for PrincipalKind {
    fn from(list: ShareList) -> Self {
        match list {
            ShareList::Users => PrincipalKind::User,
            ShareList::Groups => PrincipalKind::Group,
        }
    }
}

/// Back-reference sets kept on users and groups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackRefs {
    #[serde(default)]
    pub forms: Vec<ObjectId>,
    #[serde(default)]
    pub travelers: Vec<ObjectId>,
    #[serde(default)]
    pub binders: Vec<ObjectId>,
}

impl BackRefs {
    pub fn of_kind(&self, kind: DocKind) -> &[ObjectId] {
        match kind {
            DocKind::Form => &self.forms,
            DocKind::Traveler => &self.travelers,
            DocKind::Binder => &self.binders,
        }
    }

    fn of_kind_mut(&mut self, kind: DocKind) -> &mut Vec<ObjectId> {
        match kind {
            DocKind::Form => &mut self.forms,
            DocKind::Traveler => &mut self.travelers,
            DocKind::Binder => &mut self.binders,
        }
    }

    /// Set-add; returns whether the id was newly inserted
    pub fn add(&mut self, kind: DocKind, id: ObjectId) -> bool {
        let ids = self.of_kind_mut(kind);
        if ids.contains(&id) {
            return false;
        }
        ids.push(id);
        true
    }

    /// Remove every occurrence; returns whether anything was removed
    pub fn pull(&mut self, kind: DocKind, id: &ObjectId) -> bool {
        let ids = self.of_kind_mut(kind);
        let before = ids.len();
        ids.retain(|x| x != id);
        ids.len() != before
    }
}

/// User record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    /// Lower-cased account name
    #[serde(rename = "_id")]
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visited_on: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub refs: BackRefs,

    #[serde(default)]
    pub subscribe: bool,
}

impl UserDoc {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Group record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(flatten)]
    pub refs: BackRefs,
}

impl GroupDoc {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}
