//! Index definitions for the stored collections

use bson::{doc, Document};
use mongodb::options::IndexOptions;

use super::mongo::IntoIndexes;
use crate::model::{Binder, Form, GroupDoc, Traveler, UserDoc};

fn named(name: &str) -> Option<IndexOptions> {
    Some(IndexOptions::builder().name(name.to_string()).build())
}

/// Listing queries filter on creator, owner and share entries
fn acl_indices() -> Vec<(Document, Option<IndexOptions>)> {
    vec![
        (doc! { "createdBy": 1 }, named("created_by_index")),
        (doc! { "owner": 1 }, named("owner_index")),
        (doc! { "sharedWith._id": 1 }, named("shared_with_index")),
        (doc! { "sharedGroup._id": 1 }, named("shared_group_index")),
    ]
}

impl IntoIndexes for Form {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        acl_indices()
    }
}

impl IntoIndexes for Traveler {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        let mut indices = acl_indices();
        indices.push((doc! { "devices": 1 }, named("devices_index")));
        indices
    }
}

impl IntoIndexes for Binder {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        let mut indices = acl_indices();
        indices.push((doc! { "works._id": 1 }, named("works_index")));
        indices
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        // Share requests resolve users by display name
        vec![(doc! { "name": 1 }, named("name_index"))]
    }
}

impl IntoIndexes for GroupDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        Vec::new()
    }
}
