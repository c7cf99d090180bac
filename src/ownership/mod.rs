//! Ownership transfer
//!
//! The new owner is named by display name and resolved through the
//! directory with the same single-entry rules as share targets. Only the
//! current owner may hand a document over, and travelers and binders only
//! while they are still in progress.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::access::{require_owner, require_status, Principal};
use crate::directory::DirectoryLookup;
use crate::model::{DocKind, Document};
use crate::store::DocumentStore;
use crate::types::{Result, TravelerError};

/// Result of an ownership change request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerChange {
    /// The resolved principal already is the recorded owner
    Unchanged(String),
    Transferred(String),
}

impl OwnerChange {
    pub fn owner(&self) -> &str {
        match self {
            OwnerChange::Unchanged(id) | OwnerChange::Transferred(id) => id,
        }
    }
}

#[derive(Clone)]
pub struct OwnershipTransfer {
    directory: DirectoryLookup,
    documents: Arc<dyn DocumentStore>,
}

impl OwnershipTransfer {
    pub fn new(directory: DirectoryLookup, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            directory,
            documents,
        }
    }

    /// Transfer `doc` to the user whose display name is `target_name`.
    ///
    /// Lookup and save failures leave the document untouched.
    pub async fn change_owner(
        &self,
        doc: &mut Document,
        target_name: &str,
        principal: &Principal,
    ) -> Result<OwnerChange> {
        require_owner(principal, doc)?;
        match doc.kind() {
            DocKind::Traveler => require_status(doc, &[0.0, 1.0, 1.5])?,
            DocKind::Binder => require_status(doc, &[0.0, 1.0])?,
            DocKind::Form => {}
        }

        let entry = self.directory.user_by_name(target_name).await?;
        let id = entry.account_id().ok_or_else(|| {
            TravelerError::Directory(format!("{} has no account name", target_name))
        })?;

        if doc.acl().owner.as_deref() == Some(id.as_str()) {
            return Ok(OwnerChange::Unchanged(id));
        }

        let mut next = doc.clone();
        let acl = next.acl_mut();
        acl.owner = Some(id.clone());
        acl.transferred_on = Some(Utc::now());
        self.documents.save(&next).await?;
        *doc = next;
        info!(kind = %doc.kind(), doc = %doc.id(), owner = %id, "owner changed");
        Ok(OwnerChange::Transferred(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::is_owner;
    use crate::directory::{DirectoryConfig, StaticDirectory};
    use crate::model::{Binder, BinderStatus, Form, Traveler, TravelerStatus};
    use crate::store::MemoryStore;

    fn transfer(store: Arc<MemoryStore>, directory: StaticDirectory) -> OwnershipTransfer {
        let lookup = DirectoryLookup::new(DirectoryConfig::default(), Arc::new(directory));
        OwnershipTransfer::new(lookup, store)
    }

    fn bob() -> StaticDirectory {
        StaticDirectory::new().with_user("BSmith", "Bob Smith")
    }

    #[tokio::test]
    async fn test_transfer_sets_owner() {
        let store = Arc::new(MemoryStore::new());
        let owners = transfer(store.clone(), bob());
        let mut doc = Document::from(Traveler::new("t", "alice", 1));

        let change = owners
            .change_owner(&mut doc, "Bob Smith", &Principal::new("alice"))
            .await
            .unwrap();
        assert_eq!(change, OwnerChange::Transferred("bsmith".into()));
        assert!(doc.acl().transferred_on.is_some());
        assert!(is_owner(&Principal::new("bsmith"), doc.acl()));
        assert!(!is_owner(&Principal::new("alice"), doc.acl()));

        let again = owners
            .change_owner(&mut doc, "Bob Smith", &Principal::new("bsmith"))
            .await
            .unwrap();
        assert_eq!(again, OwnerChange::Unchanged("bsmith".into()));
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_previous_owner_cannot_transfer_back() {
        let store = Arc::new(MemoryStore::new());
        let owners = transfer(store.clone(), bob().with_user("alice", "Alice"));
        let mut doc = Document::from(Form::new("f", "", "alice"));
        let alice = Principal::new("alice");

        owners.change_owner(&mut doc, "Bob Smith", &alice).await.unwrap();
        let err = owners.change_owner(&mut doc, "Alice", &alice).await.unwrap_err();
        assert!(matches!(err, TravelerError::Unauthorized(_)));
        assert_eq!(doc.acl().owner.as_deref(), Some("bsmith"));
    }

    #[tokio::test]
    async fn test_finished_work_keeps_owner() {
        let store = Arc::new(MemoryStore::new());
        let owners = transfer(store.clone(), bob());
        let alice = Principal::new("alice");

        let mut traveler = Traveler::new("t", "alice", 1);
        traveler.status = TravelerStatus::Completed;
        traveler.acl.archived = true;
        let mut doc = Document::from(traveler);
        let err = owners.change_owner(&mut doc, "Bob Smith", &alice).await.unwrap_err();
        assert!(matches!(err, TravelerError::BadRequest(_)));
        assert!(doc.acl().owner.is_none());

        let mut binder = Binder::new("b", "", "alice");
        binder.status = BinderStatus::Completed;
        let mut doc = Document::from(binder);
        let err = owners.change_owner(&mut doc, "Bob Smith", &alice).await.unwrap_err();
        assert!(matches!(err, TravelerError::BadRequest(_)));

        let mut traveler = Traveler::new("t", "alice", 1);
        traveler.status = TravelerStatus::SubmittedForCompletion;
        let mut doc = Document::from(traveler);
        owners.change_owner(&mut doc, "Bob Smith", &alice).await.unwrap();
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_owner() {
        let store = Arc::new(MemoryStore::new());
        let owners = transfer(store.clone(), bob());
        let mut doc = Document::from(Binder::new("b", "", "alice"));

        store.fail_next_saves(1);
        let err = owners
            .change_owner(&mut doc, "Bob Smith", &Principal::new("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, TravelerError::Database(_)));
        assert!(doc.acl().owner.is_none());
        assert!(doc.acl().transferred_on.is_none());
    }

    #[tokio::test]
    async fn test_ambiguous_name_leaves_owner() {
        let store = Arc::new(MemoryStore::new());
        let dir = StaticDirectory::new()
            .with_user("bob1", "bob")
            .with_user("bob2", "bob");
        let owners = transfer(store.clone(), dir);
        let mut doc = Document::from(Traveler::new("t", "alice", 1));

        let err = owners
            .change_owner(&mut doc, "bob", &Principal::new("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, TravelerError::Ambiguous(_)));
        assert!(doc.acl().owner.is_none());
        assert_eq!(store.save_count(), 0);
    }
}
