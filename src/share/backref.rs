//! Best-effort back-reference updates
//!
//! Sharing a document also records the document id on the target user or
//! group record. That secondary write runs on a background task fed by a
//! bounded queue: enqueueing never blocks the request, a full or closed queue
//! drops the job with a warning, and job failures are logged and swallowed.
//! The share lists on the document stay authoritative.

use bson::oid::ObjectId;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::model::{DocKind, GroupDoc, PrincipalKind, UserDoc};
use crate::store::PrincipalStore;
use crate::types::{Result, TravelerError};

/// Local record to create when a share target came from the directory
#[derive(Debug, Clone)]
pub enum PrincipalRecord {
    User(UserDoc),
    Group(GroupDoc),
}

impl PrincipalRecord {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            PrincipalRecord::User(_) => PrincipalKind::User,
            PrincipalRecord::Group(_) => PrincipalKind::Group,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            PrincipalRecord::User(u) => &u.id,
            PrincipalRecord::Group(g) => &g.id,
        }
    }
}

/// A queued back-reference update
#[derive(Debug)]
pub enum BackrefJob {
    /// Set-add on an existing principal
    Add {
        principal: PrincipalKind,
        principal_id: String,
        kind: DocKind,
        doc_id: ObjectId,
    },
    /// Create the principal record if missing, then set-add
    Ensure {
        record: PrincipalRecord,
        kind: DocKind,
        doc_id: ObjectId,
    },
    Pull {
        principal: PrincipalKind,
        principal_id: String,
        kind: DocKind,
        doc_id: ObjectId,
    },
    /// Barrier: answered once every earlier job has run
    Flush(oneshot::Sender<()>),
}

/// Handle to the back-reference worker
#[derive(Clone)]
pub struct BackrefQueue {
    tx: mpsc::Sender<BackrefJob>,
}

impl BackrefQueue {
    /// Start the worker task. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn PrincipalStore>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(worker_task(store, rx));
        info!(capacity, "back-reference worker started");
        Self { tx }
    }

    /// Queue a job without waiting. Returns whether it was accepted.
    pub fn enqueue(&self, job: BackrefJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(job = ?job, "back-reference queue full, dropping update");
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                warn!(job = ?job, "back-reference worker stopped, dropping update");
                false
            }
        }
    }

    /// Wait until every job queued before this call has been processed
    pub async fn flush(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(BackrefJob::Flush(done_tx))
            .await
            .map_err(|_| TravelerError::Internal("back-reference worker stopped".into()))?;
        done_rx
            .await
            .map_err(|_| TravelerError::Internal("back-reference worker stopped".into()))
    }
}

async fn worker_task(store: Arc<dyn PrincipalStore>, mut rx: mpsc::Receiver<BackrefJob>) {
    while let Some(job) = rx.recv().await {
        if let BackrefJob::Flush(done) = job {
            let _ = done.send(());
            continue;
        }
        let label = format!("{:?}", job);
        if let Err(e) = apply(store.as_ref(), job).await {
            warn!(job = %label, error = %e, "back-reference update failed");
        }
    }
    debug!("back-reference worker exiting");
}

async fn apply(store: &dyn PrincipalStore, job: BackrefJob) -> Result<()> {
    match job {
        BackrefJob::Add {
            principal,
            principal_id,
            kind,
            doc_id,
        } => {
            store
                .add_backref(principal, &principal_id, kind, doc_id)
                .await?;
        }
        BackrefJob::Ensure {
            record,
            kind,
            doc_id,
        } => {
            let (principal, id) = (record.kind(), record.id().to_string());
            let exists = match principal {
                PrincipalKind::User => store.find_user(&id).await?.is_some(),
                PrincipalKind::Group => store.find_group(&id).await?.is_some(),
            };
            if !exists {
                let created = match record {
                    PrincipalRecord::User(user) => store.insert_user(user).await,
                    PrincipalRecord::Group(group) => store.insert_group(group).await,
                };
                // A concurrent share may have created it first
                if let Err(e) = created {
                    debug!(id = %id, error = %e, "principal insert failed, retrying as update");
                }
            }
            store.add_backref(principal, &id, kind, doc_id).await?;
        }
        BackrefJob::Pull {
            principal,
            principal_id,
            kind,
            doc_id,
        } => {
            store
                .pull_backref(principal, &principal_id, kind, doc_id)
                .await?;
        }
        BackrefJob::Flush(done) => {
            let _ = done.send(());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_ensure_creates_missing_principal() {
        let store = Arc::new(MemoryStore::new());
        let queue = BackrefQueue::spawn(store.clone(), 8);
        let doc_id = ObjectId::new();

        assert!(queue.enqueue(BackrefJob::Ensure {
            record: PrincipalRecord::User(UserDoc::new("bob", "Bob")),
            kind: DocKind::Traveler,
            doc_id,
        }));
        queue.flush().await.unwrap();

        let bob = store.user("bob").unwrap();
        assert_eq!(bob.refs.travelers, vec![doc_id]);
    }

    #[tokio::test]
    async fn test_failed_job_does_not_stop_worker() {
        let store = Arc::new(MemoryStore::new());
        store.insert_group_record(GroupDoc::new("lab.frib.ops", "Ops"));
        let queue = BackrefQueue::spawn(store.clone(), 8);
        let doc_id = ObjectId::new();

        queue.enqueue(BackrefJob::Pull {
            principal: PrincipalKind::User,
            principal_id: "ghost".into(),
            kind: DocKind::Form,
            doc_id,
        });
        queue.enqueue(BackrefJob::Add {
            principal: PrincipalKind::Group,
            principal_id: "lab.frib.ops".into(),
            kind: DocKind::Form,
            doc_id,
        });
        queue.flush().await.unwrap();

        assert_eq!(store.group("lab.frib.ops").unwrap().refs.forms, vec![doc_id]);
    }

    #[tokio::test]
    async fn test_full_queue_drops_job() {
        let (tx, _rx) = mpsc::channel(1);
        let queue = BackrefQueue { tx };
        let job = || BackrefJob::Add {
            principal: PrincipalKind::User,
            principal_id: "bob".into(),
            kind: DocKind::Form,
            doc_id: ObjectId::new(),
        };
        assert!(queue.enqueue(job()));
        assert!(!queue.enqueue(job()));
    }
}
