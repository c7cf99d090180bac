//! DashMap-backed store
//!
//! Implements both [`DocumentStore`] and [`PrincipalStore`]. Counts saves so
//! tests can assert that unchanged documents are not written back, and can
//! be told to fail upcoming saves.

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{DocumentStore, PrincipalStore};
use crate::model::{
    BackRefs, Binder, DocKind, Document, GroupDoc, PrincipalKind, Traveler, UserDoc,
};
use crate::types::{Result, TravelerError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<ObjectId, Document>,
    users: DashMap<String, UserDoc>,
    groups: DashMap<String, GroupDoc>,
    saves: AtomicUsize,
    failing_saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document without counting it as a save
    pub fn insert(&self, doc: impl Into<Document>) {
        let doc = doc.into();
        self.documents.insert(doc.id(), doc);
    }

    pub fn insert_user_record(&self, user: UserDoc) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn insert_group_record(&self, group: GroupDoc) {
        self.groups.insert(group.id.clone(), group);
    }

    pub fn get(&self, id: &ObjectId) -> Option<Document> {
        self.documents.get(id).map(|d| d.clone())
    }

    pub fn user(&self, id: &str) -> Option<UserDoc> {
        self.users.get(id).map(|u| u.clone())
    }

    pub fn group(&self, id: &str) -> Option<GroupDoc> {
        self.groups.get(id).map(|g| g.clone())
    }

    /// Number of `save` calls served
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make the next `n` saves fail with a database error
    pub fn fail_next_saves(&self, n: usize) {
        self.failing_saves.store(n, Ordering::SeqCst);
    }

    fn with_refs<R>(
        &self,
        principal: PrincipalKind,
        id: &str,
        f: impl FnOnce(&mut BackRefs) -> R,
    ) -> Result<R> {
        match principal {
            PrincipalKind::User => self
                .users
                .get_mut(id)
                .map(|mut u| f(&mut u.refs))
                .ok_or_else(|| TravelerError::NotFound(format!("user {}", id))),
            PrincipalKind::Group => self
                .groups
                .get_mut(id)
                .map(|mut g| f(&mut g.refs))
                .ok_or_else(|| TravelerError::NotFound(format!("group {}", id))),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self, kind: DocKind, id: &ObjectId) -> Result<Option<Document>> {
        Ok(self
            .documents
            .get(id)
            .filter(|d| d.kind() == kind)
            .map(|d| d.clone()))
    }

    async fn save(&self, doc: &Document) -> Result<()> {
        let failing = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(TravelerError::Database(format!(
                "write of {} {} failed",
                doc.kind(),
                doc.id()
            )));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.documents.insert(doc.id(), doc.clone());
        Ok(())
    }

    async fn list(&self, kind: DocKind) -> Result<Vec<Document>> {
        Ok(self
            .documents
            .iter()
            .filter(|d| d.kind() == kind)
            .map(|d| d.clone())
            .collect())
    }

    async fn find_travelers(&self, ids: &[ObjectId]) -> Result<Vec<Traveler>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.documents.get(id))
            .filter_map(|d| d.as_traveler().cloned())
            .collect())
    }

    async fn find_binders(&self, ids: &[ObjectId]) -> Result<Vec<Binder>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.documents.get(id))
            .filter_map(|d| d.as_binder().cloned())
            .collect())
    }
}

#[async_trait]
impl PrincipalStore for MemoryStore {
    async fn find_user(&self, id: &str) -> Result<Option<UserDoc>> {
        Ok(self.user(id))
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<UserDoc>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.name == name)
            .map(|u| u.clone()))
    }

    async fn find_group(&self, id: &str) -> Result<Option<GroupDoc>> {
        Ok(self.group(id))
    }

    async fn insert_user(&self, user: UserDoc) -> Result<()> {
        if self.users.contains_key(&user.id) {
            return Err(TravelerError::Database(format!(
                "duplicate key: user {}",
                user.id
            )));
        }
        self.insert_user_record(user);
        Ok(())
    }

    async fn insert_group(&self, group: GroupDoc) -> Result<()> {
        if self.groups.contains_key(&group.id) {
            return Err(TravelerError::Database(format!(
                "duplicate key: group {}",
                group.id
            )));
        }
        self.insert_group_record(group);
        Ok(())
    }

    async fn add_backref(
        &self,
        principal: PrincipalKind,
        principal_id: &str,
        kind: DocKind,
        doc_id: ObjectId,
    ) -> Result<bool> {
        self.with_refs(principal, principal_id, |refs| refs.add(kind, doc_id))
    }

    async fn pull_backref(
        &self,
        principal: PrincipalKind,
        principal_id: &str,
        kind: DocKind,
        doc_id: ObjectId,
    ) -> Result<()> {
        self.with_refs(principal, principal_id, |refs| {
            refs.pull(kind, &doc_id);
        })
    }

    async fn touch_user(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        match self.users.get_mut(id) {
            Some(mut user) => {
                user.last_visited_on = Some(at);
                Ok(())
            }
            None => Err(TravelerError::NotFound(format!("user {}", id))),
        }
    }

    async fn list_users(&self) -> Result<Vec<UserDoc>> {
        Ok(self.users.iter().map(|u| u.clone()).collect())
    }

    async fn list_groups(&self) -> Result<Vec<GroupDoc>> {
        Ok(self.groups.iter().map(|g| g.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Form;

    #[tokio::test]
    async fn test_load_checks_kind() {
        let store = MemoryStore::new();
        let form = Form::new("f", "", "alice");
        let id = form.id;
        store.insert(form);

        assert!(store.load(DocKind::Form, &id).await.unwrap().is_some());
        assert!(store.load(DocKind::Binder, &id).await.unwrap().is_none());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_save_writes_nothing() {
        let store = MemoryStore::new();
        let doc = Document::from(Form::new("f", "", "alice"));
        store.fail_next_saves(1);

        let err = store.save(&doc).await.unwrap_err();
        assert!(matches!(err, TravelerError::Database(_)));
        assert!(store.get(&doc.id()).is_none());
        assert_eq!(store.save_count(), 0);

        store.save(&doc).await.unwrap();
        assert!(store.get(&doc.id()).is_some());
    }

    #[tokio::test]
    async fn test_backrefs_require_principal() {
        let store = MemoryStore::new();
        let id = ObjectId::new();
        let err = store
            .add_backref(PrincipalKind::User, "ghost", DocKind::Form, id)
            .await
            .unwrap_err();
        assert!(matches!(err, TravelerError::NotFound(_)));

        store.insert_group_record(GroupDoc::new("lab.frib.ops", "Ops"));
        assert!(store
            .add_backref(PrincipalKind::Group, "lab.frib.ops", DocKind::Form, id)
            .await
            .unwrap());
        assert!(!store
            .add_backref(PrincipalKind::Group, "lab.frib.ops", DocKind::Form, id)
            .await
            .unwrap());
        store
            .pull_backref(PrincipalKind::Group, "lab.frib.ops", DocKind::Form, id)
            .await
            .unwrap();
        assert!(store.group("lab.frib.ops").unwrap().refs.forms.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_user_rejected() {
        let store = MemoryStore::new();
        store.insert_user(UserDoc::new("bob", "Bob")).await.unwrap();
        assert!(store.insert_user(UserDoc::new("bob", "Bob")).await.is_err());
        assert_eq!(
            store.find_user_by_name("Bob").await.unwrap().map(|u| u.id),
            Some("bob".to_string())
        );
    }
}
