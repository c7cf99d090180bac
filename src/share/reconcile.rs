//! Rebuild back-references from document share lists
//!
//! Queued back-reference updates can be dropped. This pass makes every user
//! and group record agree with the share lists again.

use bson::oid::ObjectId;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::model::{BackRefs, DocKind, PrincipalKind, ShareList};
use crate::store::{DocumentStore, PrincipalStore};
use crate::types::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: usize,
    pub pulled: usize,
    /// Share entries naming a principal with no local record
    pub missing: usize,
}

type Expected = HashMap<(PrincipalKind, String), HashSet<(DocKind, ObjectId)>>;

pub async fn reconcile_backrefs(
    documents: &dyn DocumentStore,
    principals: &dyn PrincipalStore,
) -> Result<ReconcileReport> {
    let mut expected: Expected = HashMap::new();
    for kind in DocKind::ALL {
        for doc in documents.list(kind).await? {
            for list in [ShareList::Users, ShareList::Groups] {
                for entry in doc.acl().list(list) {
                    expected
                        .entry((list.into(), entry.id.clone()))
                        .or_default()
                        .insert((kind, doc.id()));
                }
            }
        }
    }

    let mut report = ReconcileReport::default();
    let mut seen = HashSet::new();

    let users = principals.list_users().await?;
    let groups = principals.list_groups().await?;
    let records = users
        .into_iter()
        .map(|u| (PrincipalKind::User, u.id, u.refs))
        .chain(groups.into_iter().map(|g| (PrincipalKind::Group, g.id, g.refs)));

    for (principal, id, refs) in records {
        let key = (principal, id);
        let wanted = expected.get(&key).cloned().unwrap_or_default();
        reconcile_one(principals, &key, &refs, &wanted, &mut report).await?;
        seen.insert(key);
    }

    for (key, docs) in &expected {
        if !seen.contains(key) {
            warn!(principal = ?key.0, id = %key.1, shares = docs.len(), "shared with unknown principal");
            report.missing += 1;
        }
    }

    info!(
        added = report.added,
        pulled = report.pulled,
        missing = report.missing,
        "back-references reconciled"
    );
    Ok(report)
}

async fn reconcile_one(
    principals: &dyn PrincipalStore,
    (principal, id): &(PrincipalKind, String),
    refs: &BackRefs,
    wanted: &HashSet<(DocKind, ObjectId)>,
    report: &mut ReconcileReport,
) -> Result<()> {
    for &(kind, doc_id) in wanted {
        if !refs.of_kind(kind).contains(&doc_id)
            && principals.add_backref(*principal, id, kind, doc_id).await?
        {
            report.added += 1;
        }
    }
    for kind in DocKind::ALL {
        for doc_id in refs.of_kind(kind) {
            if !wanted.contains(&(kind, *doc_id)) {
                principals.pull_backref(*principal, id, kind, *doc_id).await?;
                report.pulled += 1;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccessLevel, Document, GroupDoc, SharedEntry, Traveler, UserDoc};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_reconcile_adds_pulls_and_counts_missing() {
        let store = MemoryStore::new();
        let mut traveler = Traveler::new("t", "alice", 1);
        traveler
            .acl
            .shared_with
            .push(SharedEntry::new("bob", "Bob", AccessLevel::Read));
        traveler
            .acl
            .shared_with
            .push(SharedEntry::new("ghost", "Ghost", AccessLevel::Read));
        traveler
            .acl
            .shared_group
            .push(SharedEntry::new("lab.frib.ops", "Ops", AccessLevel::Write));
        let traveler_id = traveler.id;
        store.insert(Document::from(traveler));

        let stale = ObjectId::new();
        let mut carol = UserDoc::new("carol", "Carol");
        carol.refs.add(DocKind::Form, stale);
        store.insert_user_record(UserDoc::new("bob", "Bob"));
        store.insert_user_record(carol);
        store.insert_group_record(GroupDoc::new("lab.frib.ops", "Ops"));

        let report = reconcile_backrefs(&store, &store).await.unwrap();
        assert_eq!(
            report,
            ReconcileReport {
                added: 2,
                pulled: 1,
                missing: 1
            }
        );
        assert!(store.user("bob").unwrap().refs.travelers.contains(&traveler_id));
        assert!(store.group("lab.frib.ops").unwrap().refs.travelers.contains(&traveler_id));
        assert!(store.user("carol").unwrap().refs.forms.is_empty());

        let again = reconcile_backrefs(&store, &store).await.unwrap();
        assert_eq!(again.added + again.pulled, 0);
    }
}
