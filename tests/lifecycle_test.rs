//! Status lifecycle and binder progress integration tests

use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

use traveler::access::Principal;
use traveler::lifecycle::{set_binder_status, set_form_status, set_traveler_status, Transition};
use traveler::model::{
    AccessLevel, Binder, BinderStatus, DocKind, Document, Form, FormStatus, SharedEntry, Traveler,
    TravelerStatus, WorkItem, WorkRef,
};
use traveler::progress::{recompute_binder_totals, update_work_progress, WorkManager, WorkSnapshot};
use traveler::store::{DocumentStore, MemoryStore};
use traveler::TravelerError;

// =============================================================================
// Lifecycles
// =============================================================================

#[test]
fn test_form_publish_sequence() {
    let owner = Principal::new("carol");
    let mut form = Form::new("Cavity test", "<form></form>", "carol");

    for target in [0.5, 1.0, 2.0] {
        let t = assert_ok!(set_form_status(&mut form, target, &owner));
        assert!(t.is_changed());
    }
    assert_eq!(form.status, FormStatus::Obsolete);

    let mut fresh = Form::new("f", "", "carol");
    let err = assert_err!(set_form_status(&mut fresh, 1.0, &owner));
    assert!(matches!(err, TravelerError::InvalidTransition { .. }));
    assert_eq!(fresh.status, FormStatus::Editable);
    assert_err!(set_form_status(&mut fresh, 0.5, &Principal::new("dave")));
}

#[test]
fn test_same_status_is_a_no_op() {
    let owner = Principal::new("carol");
    let mut binder = Binder::new("b", "", "carol");
    let before = binder.clone();
    let t = set_binder_status(&mut binder, 0.0, &owner).unwrap();
    assert_eq!(t, Transition::Unchanged(BinderStatus::New));
    assert_eq!(binder, before);
}

#[test]
fn test_traveler_submit_open_to_writers() {
    let mut traveler = Traveler::new("t", "carol", 2);
    traveler
        .acl
        .shared_with
        .push(SharedEntry::new("dave", "Dave", AccessLevel::Write));
    let owner = Principal::new("carol");
    let writer = Principal::new("dave");

    set_traveler_status(&mut traveler, 1.0, &owner).unwrap();
    let err = set_traveler_status(&mut traveler, 3.0, &writer).unwrap_err();
    assert!(matches!(err, TravelerError::Unauthorized(_)));

    set_traveler_status(&mut traveler, 1.5, &writer).unwrap();
    assert_eq!(traveler.status, TravelerStatus::SubmittedForCompletion);
    assert_eq!(traveler.acl.updated_by.as_deref(), Some("dave"));

    set_traveler_status(&mut traveler, 2.0, &owner).unwrap();
    let err = set_traveler_status(&mut traveler, 7.0, &owner).unwrap_err();
    assert!(matches!(err, TravelerError::InvalidStatus(_)));
}

// =============================================================================
// Progress
// =============================================================================

#[test]
fn test_zero_input_traveler_is_fully_in_progress() {
    let mut traveler = Traveler::new("t", "carol", 0);
    traveler.status = TravelerStatus::Active;
    let mut work = WorkItem::new(traveler.id, WorkRef::Traveler);
    update_work_progress(&mut work, &WorkSnapshot::from(&traveler));
    assert_eq!(work.finished, 0.0);
    assert_eq!(work.in_progress, 1.0);
}

#[test]
fn test_binder_totals() {
    let mut binder = Binder::new("b", "", "carol");
    let mut done = WorkItem::new(bson::oid::ObjectId::new(), WorkRef::Traveler);
    done.value = 10.0;
    done.finished = 1.0;
    let mut half = WorkItem::new(bson::oid::ObjectId::new(), WorkRef::Traveler);
    half.value = 10.0;
    half.in_progress = 0.5;
    binder.works = vec![done, half];

    assert!(recompute_binder_totals(&mut binder));
    assert_eq!(binder.total_value, 20.0);
    assert_eq!(binder.finished_value, 10.0);
    assert_eq!(binder.in_progress_value, 5.0);
    assert!(!recompute_binder_totals(&mut binder));
}

#[tokio::test]
async fn test_nested_binder_progress_rolls_up() {
    let store = Arc::new(MemoryStore::new());
    let works = WorkManager::new(store.clone());
    let owner = Principal::new("carol");

    let mut traveler = Traveler::new("t", "carol", 4);
    traveler.status = TravelerStatus::Active;
    store.insert(Document::from(traveler.clone()));

    let mut inner = Binder::new("inner", "", "carol");
    works
        .add_works(&mut inner, WorkRef::Traveler, &[traveler.id], &owner)
        .await
        .unwrap();

    let mut outer = Binder::new("outer", "", "carol");
    inner.status = BinderStatus::Active;
    store.save(&Document::from(inner.clone())).await.unwrap();
    let outer_id = outer.id;
    works
        .add_works(&mut outer, WorkRef::Binder, &[inner.id, outer_id], &owner)
        .await
        .unwrap();
    assert_eq!(outer.works.len(), 1);

    works
        .set_finished_input(&mut traveler, 2, &owner)
        .await
        .unwrap();
    works.refresh_works(&mut inner, &owner).await.unwrap();
    assert_eq!(inner.in_progress_value, 5.0);

    works.refresh_works(&mut outer, &owner).await.unwrap();
    let work = outer.work(&inner.id).unwrap();
    assert_eq!(work.finished, 0.0);
    assert_eq!(work.in_progress, 0.5);

    let saved = store
        .load(DocKind::Binder, &outer.id)
        .await
        .unwrap()
        .and_then(Document::into_binder)
        .unwrap();
    assert_eq!(saved.in_progress_value, outer.in_progress_value);
}

#[tokio::test]
async fn test_add_works_needs_write_access() {
    let store = Arc::new(MemoryStore::new());
    let works = WorkManager::new(store.clone());
    let traveler = Traveler::new("t", "carol", 1);
    store.insert(Document::from(traveler.clone()));

    let mut binder = Binder::new("b", "", "carol");
    let err = works
        .add_works(&mut binder, WorkRef::Traveler, &[traveler.id], &Principal::new("eve"))
        .await
        .unwrap_err();
    assert!(matches!(err, TravelerError::Unauthorized(_)));
    assert!(binder.works.is_empty());
}
