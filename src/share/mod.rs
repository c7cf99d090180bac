//! Share list management
//!
//! Adds and removes users and groups on a document's share lists, and edits
//! the document-wide public access and archive flags. Only the owner may
//! edit them, and an archived traveler's share lists are frozen. Targets are
//! resolved against the local principal store first and the directory
//! second; the back-reference on the target principal is updated through the
//! [`BackrefQueue`] side channel after the document is saved.

mod backref;
mod reconcile;

pub use backref::{BackrefJob, BackrefQueue, PrincipalRecord};
pub use reconcile::{reconcile_backrefs, ReconcileReport};

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::access::{require_archived, require_owner, Principal};
use crate::directory::DirectoryLookup;
use crate::model::{AccessLevel, DocKind, Document, PrincipalKind, ShareList, SharedEntry};
use crate::store::{DocumentStore, PrincipalStore};
use crate::types::{Result, TravelerError};

/// How the share target was resolved
enum Target {
    Local(SharedEntry),
    Directory(SharedEntry, PrincipalRecord),
}

/// Owner only; travelers must not be archived
fn require_share_edit(principal: &Principal, doc: &Document) -> Result<()> {
    require_owner(principal, doc)?;
    if doc.kind() == DocKind::Traveler {
        require_archived(doc, false)?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct ShareManager {
    directory: DirectoryLookup,
    principals: Arc<dyn PrincipalStore>,
    documents: Arc<dyn DocumentStore>,
    backrefs: BackrefQueue,
}

impl ShareManager {
    pub fn new(
        directory: DirectoryLookup,
        principals: Arc<dyn PrincipalStore>,
        documents: Arc<dyn DocumentStore>,
        backrefs: BackrefQueue,
    ) -> Self {
        Self {
            directory,
            principals,
            documents,
            backrefs,
        }
    }

    pub fn backrefs(&self) -> &BackrefQueue {
        &self.backrefs
    }

    /// Apply `edit` to a copy of `doc` and replace `doc` only once the copy is saved
    async fn commit(&self, doc: &mut Document, edit: impl FnOnce(&mut Document)) -> Result<()> {
        let mut next = doc.clone();
        edit(&mut next);
        self.documents.save(&next).await?;
        *doc = next;
        Ok(())
    }

    /// Share `doc` with a user (by display name) or a group (by id).
    ///
    /// `access` is the caller's requested level; only `"write"` grants write.
    pub async fn add_share(
        &self,
        doc: &mut Document,
        list: ShareList,
        identifier: &str,
        access: Option<&str>,
        principal: &Principal,
    ) -> Result<SharedEntry> {
        require_share_edit(principal, doc)?;

        let level = AccessLevel::from_request(access);
        let target = match list {
            ShareList::Users => self.resolve_user(identifier, level).await?,
            ShareList::Groups => self.resolve_group(identifier, level).await?,
        };
        let entry = match &target {
            Target::Local(entry) | Target::Directory(entry, _) => entry.clone(),
        };

        if doc.acl().entry(list, &entry.id).is_some() {
            return Err(TravelerError::BadRequest(format!(
                "{} is already in the {} share list",
                entry.id, list
            )));
        }

        let added = entry.clone();
        self.commit(doc, |next| next.acl_mut().list_mut(list).push(added))
            .await?;
        info!(
            kind = %doc.kind(),
            doc = %doc.id(),
            list = %list,
            principal = %entry.id,
            access = %entry.access,
            "share added"
        );

        let (kind, doc_id) = (doc.kind(), doc.id());
        let job = match target {
            Target::Local(entry) => BackrefJob::Add {
                principal: PrincipalKind::from(list),
                principal_id: entry.id,
                kind,
                doc_id,
            },
            Target::Directory(_, record) => BackrefJob::Ensure {
                record,
                kind,
                doc_id,
            },
        };
        self.backrefs.enqueue(job);

        Ok(entry)
    }

    async fn resolve_user(&self, name: &str, level: AccessLevel) -> Result<Target> {
        if let Some(user) = self.principals.find_user_by_name(name).await? {
            return Ok(Target::Local(SharedEntry::new(user.id, name, level)));
        }
        let record = self.directory.user_by_name(name).await?.to_user()?;
        let entry = SharedEntry::new(record.id.clone(), name, level);
        Ok(Target::Directory(entry, PrincipalRecord::User(record)))
    }

    async fn resolve_group(&self, id: &str, level: AccessLevel) -> Result<Target> {
        let id = id.to_lowercase();
        if let Some(group) = self.principals.find_group(&id).await? {
            return Ok(Target::Local(SharedEntry::new(id, group.name, level)));
        }
        let record = self.directory.group_by_id(&id).await?.to_group()?;
        let entry = SharedEntry::new(id, record.name.clone(), level);
        Ok(Target::Directory(entry, PrincipalRecord::Group(record)))
    }

    /// Remove entries by principal id, returning the ids actually removed
    pub async fn remove_share(
        &self,
        doc: &mut Document,
        list: ShareList,
        ids: &[String],
        principal: &Principal,
    ) -> Result<Vec<String>> {
        require_share_edit(principal, doc)?;

        let mut removed: Vec<String> = Vec::new();
        for id in ids {
            if doc.acl().entry(list, id).is_some() && !removed.contains(id) {
                removed.push(id.clone());
            }
        }
        if removed.is_empty() {
            return Err(TravelerError::BadRequest(format!(
                "cannot find {} in list",
                ids.join(",")
            )));
        }

        self.commit(doc, |next| {
            next.acl_mut()
                .list_mut(list)
                .retain(|e| !removed.contains(&e.id))
        })
        .await?;
        info!(kind = %doc.kind(), doc = %doc.id(), list = %list, removed = ?removed, "shares removed");

        for id in &removed {
            self.backrefs.enqueue(BackrefJob::Pull {
                principal: PrincipalKind::from(list),
                principal_id: id.clone(),
                kind: doc.kind(),
                doc_id: doc.id(),
            });
        }
        Ok(removed)
    }

    /// Change the access of an existing share entry (`"read"` or `"write"`)
    pub async fn set_share_access(
        &self,
        doc: &mut Document,
        list: ShareList,
        share_id: &str,
        access: &str,
        principal: &Principal,
    ) -> Result<SharedEntry> {
        require_share_edit(principal, doc)?;

        let level = match access {
            "write" => AccessLevel::Write,
            "read" => AccessLevel::Read,
            other => {
                return Err(TravelerError::BadRequest(format!(
                    "cannot take the access {}",
                    other
                )))
            }
        };

        let current = doc
            .acl()
            .entry(list, share_id)
            .cloned()
            .ok_or_else(|| {
                TravelerError::Missing(format!("{} in the {} list", share_id, list))
            })?;
        if current.access == level {
            return Ok(current);
        }

        self.commit(doc, |next| {
            if let Some(entry) = next.acl_mut().entry_mut(list, share_id) {
                entry.access = level;
            }
        })
        .await?;
        info!(doc = %doc.id(), principal = %share_id, access = %level, "share access changed");

        // keep the principal's back-reference in step with the list
        self.backrefs.enqueue(BackrefJob::Add {
            principal: PrincipalKind::from(list),
            principal_id: share_id.to_string(),
            kind: doc.kind(),
            doc_id: doc.id(),
        });
        Ok(SharedEntry {
            access: level,
            ..current
        })
    }

    /// Set public access from its form value (`"-1"`, `"0"`, `"1"`).
    ///
    /// Returns whether the document changed.
    pub async fn set_public_access(
        &self,
        doc: &mut Document,
        code: &str,
        principal: &Principal,
    ) -> Result<bool> {
        require_share_edit(principal, doc)?;

        let level = AccessLevel::parse_code(code).ok_or_else(|| {
            TravelerError::BadRequest(format!("cannot take the access {}", code))
        })?;
        if doc.acl().public_access == level {
            return Ok(false);
        }
        self.commit(doc, |next| next.acl_mut().public_access = level)
            .await?;
        info!(doc = %doc.id(), access = %level, "public access changed");
        Ok(true)
    }

    /// Archive or restore a document. Returns whether the document changed.
    pub async fn set_archived(
        &self,
        doc: &mut Document,
        archived: bool,
        principal: &Principal,
    ) -> Result<bool> {
        require_owner(principal, doc)?;

        if doc.acl().archived == archived {
            return Ok(false);
        }
        self.commit(doc, |next| {
            let acl = next.acl_mut();
            acl.archived = archived;
            if archived {
                acl.archived_on = Some(Utc::now());
            }
        })
        .await?;
        info!(doc = %doc.id(), archived, "archive flag changed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectoryConfig, StaticDirectory};
    use crate::model::{Binder, Form, GroupDoc, Traveler, UserDoc};
    use crate::store::MemoryStore;

    fn manager(store: Arc<MemoryStore>, directory: StaticDirectory) -> ShareManager {
        let lookup = DirectoryLookup::new(DirectoryConfig::default(), Arc::new(directory));
        let queue = BackrefQueue::spawn(store.clone(), 16);
        ShareManager::new(lookup, store.clone(), store, queue)
    }

    fn carol() -> Principal {
        Principal::new("carol")
    }

    #[tokio::test]
    async fn test_add_local_user_defaults_to_read() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user_record(UserDoc::new("alice", "Alice Doe"));
        let shares = manager(store.clone(), StaticDirectory::new());
        let mut doc = Document::from(Form::new("f", "", "carol"));

        let entry = shares
            .add_share(&mut doc, ShareList::Users, "Alice Doe", None, &carol())
            .await
            .unwrap();
        assert_eq!(entry.id, "alice");
        assert_eq!(entry.access, AccessLevel::Read);

        shares.backrefs().flush().await.unwrap();
        assert_eq!(store.user("alice").unwrap().refs.forms, vec![doc.id()]);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_add_directory_group_creates_record() {
        let store = Arc::new(MemoryStore::new());
        let dir = StaticDirectory::new().with_group("LAB.FRIB.Ops", "Operations");
        let shares = manager(store.clone(), dir);
        let mut doc = Document::from(Binder::new("b", "", "carol"));

        let entry = shares
            .add_share(&mut doc, ShareList::Groups, "LAB.FRIB.Ops", Some("write"), &carol())
            .await
            .unwrap();
        assert_eq!(entry.id, "lab.frib.ops");
        assert_eq!(entry.name, "Operations");
        assert_eq!(entry.access, AccessLevel::Write);

        shares.backrefs().flush().await.unwrap();
        let group = store.group("lab.frib.ops").unwrap();
        assert_eq!(group.refs.binders, vec![doc.id()]);
    }

    #[tokio::test]
    async fn test_duplicate_share_rejected() {
        let store = Arc::new(MemoryStore::new());
        store.insert_group_record(GroupDoc::new("lab.frib.ops", "Ops"));
        let shares = manager(store.clone(), StaticDirectory::new());
        let mut doc = Document::from(Form::new("f", "", "carol"));

        shares
            .add_share(&mut doc, ShareList::Groups, "lab.frib.ops", None, &carol())
            .await
            .unwrap();
        let err = shares
            .add_share(&mut doc, ShareList::Groups, "LAB.FRIB.OPS", None, &carol())
            .await
            .unwrap_err();
        assert!(matches!(err, TravelerError::BadRequest(_)));
        assert_eq!(doc.acl().shared_group.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found_and_unsaved() {
        let store = Arc::new(MemoryStore::new());
        let shares = manager(store.clone(), StaticDirectory::new());
        let mut doc = Document::from(Form::new("f", "", "carol"));

        let err = shares
            .add_share(&mut doc, ShareList::Users, "Nobody", None, &carol())
            .await
            .unwrap_err();
        assert!(matches!(err, TravelerError::NotFound(_)));
        assert!(doc.acl().shared_with.is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_only_owner_edits_shares() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user_record(UserDoc::new("alice", "Alice"));
        let shares = manager(store.clone(), StaticDirectory::new());
        let mut doc = Document::from(Form::new("f", "", "carol"));
        shares
            .add_share(&mut doc, ShareList::Users, "Alice", Some("write"), &carol())
            .await
            .unwrap();

        // write access is not enough
        let writer = Principal::new("alice");
        let err = shares
            .set_share_access(&mut doc, ShareList::Users, "alice", "read", &writer)
            .await
            .unwrap_err();
        assert!(matches!(err, TravelerError::Unauthorized(_)));
        let err = shares
            .remove_share(&mut doc, ShareList::Users, &["alice".to_string()], &writer)
            .await
            .unwrap_err();
        assert!(matches!(err, TravelerError::Unauthorized(_)));
        let err = shares
            .set_public_access(&mut doc, "1", &writer)
            .await
            .unwrap_err();
        assert!(matches!(err, TravelerError::Unauthorized(_)));
        let err = shares.set_archived(&mut doc, true, &writer).await.unwrap_err();
        assert!(matches!(err, TravelerError::Unauthorized(_)));

        assert_eq!(doc.acl().shared_with[0].access, AccessLevel::Write);
        assert!(!doc.acl().archived);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_archived_traveler_shares_are_frozen() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user_record(UserDoc::new("alice", "Alice"));
        let shares = manager(store.clone(), StaticDirectory::new());
        let mut doc = Document::from(Traveler::new("t", "carol", 1));

        assert!(shares.set_archived(&mut doc, true, &carol()).await.unwrap());
        let err = shares
            .add_share(&mut doc, ShareList::Users, "Alice", None, &carol())
            .await
            .unwrap_err();
        assert!(matches!(err, TravelerError::BadRequest(_)));
        assert!(doc.acl().shared_with.is_empty());

        // restoring reopens the lists
        assert!(shares.set_archived(&mut doc, false, &carol()).await.unwrap());
        shares
            .add_share(&mut doc, ShareList::Users, "Alice", None, &carol())
            .await
            .unwrap();

        // archived forms keep editable share lists
        let mut form = Document::from(Form::new("f", "", "carol"));
        shares.set_archived(&mut form, true, &carol()).await.unwrap();
        assert!(shares.set_public_access(&mut form, "0", &carol()).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_document_unchanged() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user_record(UserDoc::new("alice", "Alice"));
        let shares = manager(store.clone(), StaticDirectory::new());
        let mut doc = Document::from(Form::new("f", "", "carol"));

        store.fail_next_saves(1);
        let err = shares
            .add_share(&mut doc, ShareList::Users, "Alice", None, &carol())
            .await
            .unwrap_err();
        assert!(matches!(err, TravelerError::Database(_)));
        assert!(doc.acl().shared_with.is_empty());

        // the retry is not mistaken for a duplicate
        let entry = shares
            .add_share(&mut doc, ShareList::Users, "Alice", None, &carol())
            .await
            .unwrap();
        assert_eq!(entry.id, "alice");

        store.fail_next_saves(1);
        assert!(shares
            .set_share_access(&mut doc, ShareList::Users, "alice", "write", &carol())
            .await
            .is_err());
        assert_eq!(doc.acl().shared_with[0].access, AccessLevel::Read);

        store.fail_next_saves(1);
        assert!(shares
            .remove_share(&mut doc, ShareList::Users, &["alice".to_string()], &carol())
            .await
            .is_err());
        assert_eq!(doc.acl().shared_with.len(), 1);

        store.fail_next_saves(2);
        assert!(shares.set_public_access(&mut doc, "0", &carol()).await.is_err());
        assert!(shares.set_archived(&mut doc, true, &carol()).await.is_err());
        assert_eq!(doc.acl().public_access, AccessLevel::NoAccess);
        assert!(!doc.acl().archived);
        assert!(doc.acl().archived_on.is_none());
    }

    #[tokio::test]
    async fn test_remove_unknown_is_bad_request() {
        let store = Arc::new(MemoryStore::new());
        let shares = manager(store, StaticDirectory::new());
        let mut doc = Document::from(Form::new("f", "", "carol"));
        let err = shares
            .remove_share(&mut doc, ShareList::Users, &["ghost".to_string()], &carol())
            .await
            .unwrap_err();
        assert!(matches!(err, TravelerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_set_share_access() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user_record(UserDoc::new("alice", "Alice"));
        let shares = manager(store, StaticDirectory::new());
        let mut doc = Document::from(Form::new("f", "", "carol"));
        shares
            .add_share(&mut doc, ShareList::Users, "Alice", None, &carol())
            .await
            .unwrap();

        let entry = shares
            .set_share_access(&mut doc, ShareList::Users, "alice", "write", &carol())
            .await
            .unwrap();
        assert_eq!(entry.access, AccessLevel::Write);
        assert_eq!(doc.acl().shared_with[0].access, AccessLevel::Write);

        assert!(matches!(
            shares
                .set_share_access(&mut doc, ShareList::Users, "alice", "admin", &carol())
                .await,
            Err(TravelerError::BadRequest(_))
        ));
        let err = shares
            .set_share_access(&mut doc, ShareList::Users, "bob", "read", &carol())
            .await
            .unwrap_err();
        assert!(matches!(err, TravelerError::Missing(_)));
        assert_eq!(err.status_code(), hyper::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_public_access_and_archive() {
        let store = Arc::new(MemoryStore::new());
        let shares = manager(store.clone(), StaticDirectory::new());
        let mut doc = Document::from(Form::new("f", "", "carol"));

        assert!(!shares.set_public_access(&mut doc, "-1", &carol()).await.unwrap());
        assert!(shares.set_public_access(&mut doc, "1", &carol()).await.unwrap());
        assert_eq!(doc.acl().public_access, AccessLevel::Write);
        assert!(shares.set_public_access(&mut doc, "2", &carol()).await.is_err());

        assert!(shares.set_archived(&mut doc, true, &carol()).await.unwrap());
        assert!(doc.acl().archived_on.is_some());
        assert!(!shares.set_archived(&mut doc, true, &carol()).await.unwrap());
        assert_eq!(store.save_count(), 2);
    }
}
