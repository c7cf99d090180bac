//! MongoDB implementation of the store traits

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::mongo::{MongoClient, MongoCollection};
use crate::model::{
    Binder, DocKind, Document, Form, GroupDoc, PrincipalKind, Traveler, UserDoc,
    BINDER_COLLECTION, FORM_COLLECTION, GROUP_COLLECTION, TRAVELER_COLLECTION, USER_COLLECTION,
};
use crate::store::{DocumentStore, PrincipalStore};
use crate::types::{Result, TravelerError};

/// Collections used by the engine
#[derive(Clone)]
pub struct MongoStore {
    forms: MongoCollection<Form>,
    travelers: MongoCollection<Traveler>,
    binders: MongoCollection<Binder>,
    users: MongoCollection<UserDoc>,
    groups: MongoCollection<GroupDoc>,
}

impl MongoStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            forms: client.collection(FORM_COLLECTION).await?,
            travelers: client.collection(TRAVELER_COLLECTION).await?,
            binders: client.collection(BINDER_COLLECTION).await?,
            users: client.collection(USER_COLLECTION).await?,
            groups: client.collection(GROUP_COLLECTION).await?,
        })
    }

    async fn update_refs(
        &self,
        principal: PrincipalKind,
        principal_id: &str,
        update: bson::Document,
    ) -> Result<mongodb::results::UpdateResult> {
        let filter = doc! { "_id": principal_id };
        let result = match principal {
            PrincipalKind::User => self.users.update_one(filter, update).await?,
            PrincipalKind::Group => self.groups.update_one(filter, update).await?,
        };
        if result.matched_count == 0 {
            return Err(TravelerError::NotFound(format!(
                "{:?} {}",
                principal, principal_id
            )));
        }
        Ok(result)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn load(&self, kind: DocKind, id: &ObjectId) -> Result<Option<Document>> {
        let filter = doc! { "_id": *id };
        Ok(match kind {
            DocKind::Form => self.forms.find_one(filter).await?.map(Document::from),
            DocKind::Traveler => self.travelers.find_one(filter).await?.map(Document::from),
            DocKind::Binder => self.binders.find_one(filter).await?.map(Document::from),
        })
    }

    async fn save(&self, doc: &Document) -> Result<()> {
        let filter = doc! { "_id": doc.id() };
        debug!(kind = %doc.kind(), id = %doc.id(), "saving document");
        match doc {
            Document::Form(f) => self.forms.replace_one(filter, f).await?,
            Document::Traveler(t) => self.travelers.replace_one(filter, t).await?,
            Document::Binder(b) => self.binders.replace_one(filter, b).await?,
        };
        Ok(())
    }

    async fn list(&self, kind: DocKind) -> Result<Vec<Document>> {
        Ok(match kind {
            DocKind::Form => into_documents(self.forms.find_many(doc! {}).await?),
            DocKind::Traveler => into_documents(self.travelers.find_many(doc! {}).await?),
            DocKind::Binder => into_documents(self.binders.find_many(doc! {}).await?),
        })
    }

    async fn find_travelers(&self, ids: &[ObjectId]) -> Result<Vec<Traveler>> {
        self.travelers
            .find_many(doc! { "_id": { "$in": ids.to_vec() } })
            .await
    }

    async fn find_binders(&self, ids: &[ObjectId]) -> Result<Vec<Binder>> {
        self.binders
            .find_many(doc! { "_id": { "$in": ids.to_vec() } })
            .await
    }
}

fn into_documents<T: Into<Document>>(items: Vec<T>) -> Vec<Document> {
    items.into_iter().map(Into::into).collect()
}

#[async_trait]
impl PrincipalStore for MongoStore {
    async fn find_user(&self, id: &str) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "_id": id }).await
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "name": name }).await
    }

    async fn find_group(&self, id: &str) -> Result<Option<GroupDoc>> {
        self.groups.find_one(doc! { "_id": id }).await
    }

    async fn insert_user(&self, user: UserDoc) -> Result<()> {
        self.users.insert_one(user).await
    }

    async fn insert_group(&self, group: GroupDoc) -> Result<()> {
        self.groups.insert_one(group).await
    }

    async fn add_backref(
        &self,
        principal: PrincipalKind,
        principal_id: &str,
        kind: DocKind,
        doc_id: ObjectId,
    ) -> Result<bool> {
        let field = kind.backref_field();
        let update = doc! { "$addToSet": { field: doc_id } };
        let result = self.update_refs(principal, principal_id, update).await?;
        Ok(result.modified_count > 0)
    }

    async fn pull_backref(
        &self,
        principal: PrincipalKind,
        principal_id: &str,
        kind: DocKind,
        doc_id: ObjectId,
    ) -> Result<()> {
        let field = kind.backref_field();
        let update = doc! { "$pull": { field: doc_id } };
        self.update_refs(principal, principal_id, update).await?;
        Ok(())
    }

    async fn touch_user(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        // Same encoding as the serialized UserDoc field
        let at = bson::to_bson(&at)?;
        self.update_refs(
            PrincipalKind::User,
            id,
            doc! { "$set": { "lastVisitedOn": at } },
        )
        .await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserDoc>> {
        self.users.find_many(doc! {}).await
    }

    async fn list_groups(&self) -> Result<Vec<GroupDoc>> {
        self.groups.find_many(doc! {}).await
    }
}
