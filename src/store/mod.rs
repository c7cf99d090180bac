//! Persistence collaborators
//!
//! The engine reads and writes documents and principal records through these
//! traits. [`MemoryStore`] backs tests and embedders; the MongoDB
//! implementation lives in [`crate::db`].

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

use crate::model::{Binder, DocKind, Document, GroupDoc, PrincipalKind, Traveler, UserDoc};
use crate::types::Result;

/// Form, traveler and binder persistence
///
/// Saves replace the whole document; concurrent writers are last-write-wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load(&self, kind: DocKind, id: &ObjectId) -> Result<Option<Document>>;

    async fn save(&self, doc: &Document) -> Result<()>;

    async fn list(&self, kind: DocKind) -> Result<Vec<Document>>;

    /// Travelers with any of the given ids; missing ids are skipped
    async fn find_travelers(&self, ids: &[ObjectId]) -> Result<Vec<Traveler>>;

    /// Binders with any of the given ids; missing ids are skipped
    async fn find_binders(&self, ids: &[ObjectId]) -> Result<Vec<Binder>>;
}

/// Local user and group records
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<UserDoc>>;

    /// First user whose display name equals `name`
    async fn find_user_by_name(&self, name: &str) -> Result<Option<UserDoc>>;

    async fn find_group(&self, id: &str) -> Result<Option<GroupDoc>>;

    /// Insert a new user; an existing id is an error
    async fn insert_user(&self, user: UserDoc) -> Result<()>;

    async fn insert_group(&self, group: GroupDoc) -> Result<()>;

    /// Set-add a document id to a principal's back-references.
    ///
    /// Returns whether the id was newly added; a missing principal is
    /// `NotFound`.
    async fn add_backref(
        &self,
        principal: PrincipalKind,
        principal_id: &str,
        kind: DocKind,
        doc_id: ObjectId,
    ) -> Result<bool>;

    /// Remove a document id from a principal's back-references
    async fn pull_backref(
        &self,
        principal: PrincipalKind,
        principal_id: &str,
        kind: DocKind,
        doc_id: ObjectId,
    ) -> Result<()>;

    /// Record a login
    async fn touch_user(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

    async fn list_users(&self) -> Result<Vec<UserDoc>>;

    async fn list_groups(&self) -> Result<Vec<GroupDoc>>;
}
