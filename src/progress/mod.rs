//! Work progress aggregation
//!
//! A binder caches the progress of each child traveler or binder on its
//! work item and aggregates those into value-weighted totals. The pure
//! functions here apply the progress rules; [`WorkManager`] drives them for
//! the binder work-list operations that load children and persist results.
//!
//! A child with zero total work (no inputs, or no valued works) that has
//! started counts as fully in progress, not as zero progress.

mod works;

pub use works::{WorkManager, WorkUpdate, WorkView};

use bson::oid::ObjectId;

use crate::model::{Binder, BinderStatus, Traveler, TravelerStatus, WorkItem, WorkRef};

/// Progress-relevant fields of a child document
#[derive(Debug, Clone, PartialEq)]
pub enum WorkSnapshot {
    Traveler {
        id: ObjectId,
        status: TravelerStatus,
        total_input: u32,
        finished_input: u32,
    },
    Binder {
        id: ObjectId,
        status: BinderStatus,
        total_value: f64,
        finished_value: f64,
        in_progress_value: f64,
    },
}

impl WorkSnapshot {
    pub fn id(&self) -> ObjectId {
        match self {
            WorkSnapshot::Traveler { id, .. } | WorkSnapshot::Binder { id, .. } => *id,
        }
    }

    pub fn ref_type(&self) -> WorkRef {
        match self {
            WorkSnapshot::Traveler { .. } => WorkRef::Traveler,
            WorkSnapshot::Binder { .. } => WorkRef::Binder,
        }
    }

    pub fn status_code(&self) -> f64 {
        match self {
            WorkSnapshot::Traveler { status, .. } => status.code(),
            WorkSnapshot::Binder { status, .. } => status.code(),
        }
    }
}

impl From<&Traveler> for WorkSnapshot {
    fn from(t: &Traveler) -> Self {
        WorkSnapshot::Traveler {
            id: t.id,
            status: t.status,
            total_input: t.total_input,
            finished_input: t.finished_input,
        }
    }
}

impl From<&Binder> for WorkSnapshot {
    fn from(b: &Binder) -> Self {
        WorkSnapshot::Binder {
            id: b.id,
            status: b.status,
            total_value: b.total_value,
            finished_value: b.finished_value,
            in_progress_value: b.in_progress_value,
        }
    }
}

/// Refresh a work item's cached status and progress from its child
pub fn update_work_progress(work: &mut WorkItem, snapshot: &WorkSnapshot) {
    work.status = snapshot.status_code();

    let (finished, in_progress) = match *snapshot {
        WorkSnapshot::Traveler {
            status: TravelerStatus::Completed,
            ..
        }
        | WorkSnapshot::Binder {
            status: BinderStatus::Completed,
            ..
        } => (1.0, 0.0),
        WorkSnapshot::Traveler {
            status: TravelerStatus::Initialized,
            ..
        }
        | WorkSnapshot::Binder {
            status: BinderStatus::New,
            ..
        } => (0.0, 0.0),
        WorkSnapshot::Traveler {
            total_input,
            finished_input,
            ..
        } => {
            if total_input == 0 {
                (0.0, 1.0)
            } else {
                (0.0, f64::from(finished_input) / f64::from(total_input))
            }
        }
        WorkSnapshot::Binder {
            total_value,
            finished_value,
            in_progress_value,
            ..
        } => {
            if total_value == 0.0 {
                (0.0, 1.0)
            } else {
                (finished_value / total_value, in_progress_value / total_value)
            }
        }
    };

    work.finished = finished;
    work.in_progress = in_progress;
}

/// Recompute the binder's value totals from its works.
///
/// Returns whether any total changed.
pub fn recompute_binder_totals(binder: &mut Binder) -> bool {
    let (mut total, mut finished, mut in_progress) = (0.0, 0.0, 0.0);
    for w in &binder.works {
        total += w.value;
        finished += w.value * w.finished;
        in_progress += w.value * w.in_progress;
    }

    let changed = binder.total_value != total
        || binder.finished_value != finished
        || binder.in_progress_value != in_progress;
    binder.total_value = total;
    binder.finished_value = finished;
    binder.in_progress_value = in_progress;
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traveler_snapshot(status: TravelerStatus, total: u32, finished: u32) -> WorkSnapshot {
        WorkSnapshot::Traveler {
            id: ObjectId::new(),
            status,
            total_input: total,
            finished_input: finished,
        }
    }

    fn binder_snapshot(status: BinderStatus, total: f64, finished: f64, active: f64) -> WorkSnapshot {
        WorkSnapshot::Binder {
            id: ObjectId::new(),
            status,
            total_value: total,
            finished_value: finished,
            in_progress_value: active,
        }
    }

    fn work_for(snapshot: &WorkSnapshot) -> WorkItem {
        WorkItem::new(snapshot.id(), snapshot.ref_type())
    }

    #[test]
    fn test_completed_child_is_finished() {
        for snap in [
            traveler_snapshot(TravelerStatus::Completed, 10, 3),
            binder_snapshot(BinderStatus::Completed, 20.0, 5.0, 5.0),
        ] {
            let mut work = work_for(&snap);
            update_work_progress(&mut work, &snap);
            assert_eq!((work.finished, work.in_progress), (1.0, 0.0));
            assert_eq!(work.status, 2.0);
        }
    }

    #[test]
    fn test_new_child_has_no_progress() {
        for snap in [
            traveler_snapshot(TravelerStatus::Initialized, 10, 3),
            binder_snapshot(BinderStatus::New, 20.0, 5.0, 5.0),
        ] {
            let mut work = work_for(&snap);
            work.in_progress = 0.7;
            update_work_progress(&mut work, &snap);
            assert_eq!((work.finished, work.in_progress), (0.0, 0.0));
        }
    }

    #[test]
    fn test_active_traveler_fraction() {
        let snap = traveler_snapshot(TravelerStatus::Active, 4, 1);
        let mut work = work_for(&snap);
        update_work_progress(&mut work, &snap);
        assert_eq!((work.finished, work.in_progress), (0.0, 0.25));

        // submitted and frozen travelers keep reporting input progress
        for status in [TravelerStatus::SubmittedForCompletion, TravelerStatus::Frozen] {
            let snap = traveler_snapshot(status, 4, 2);
            update_work_progress(&mut work, &snap);
            assert_eq!(work.in_progress, 0.5);
            assert_eq!(work.status, status.code());
        }
    }

    #[test]
    fn test_zero_input_traveler_is_fully_in_progress() {
        let snap = traveler_snapshot(TravelerStatus::Active, 0, 0);
        let mut work = work_for(&snap);
        update_work_progress(&mut work, &snap);
        assert_eq!((work.finished, work.in_progress), (0.0, 1.0));
    }

    #[test]
    fn test_active_binder_fractions() {
        let snap = binder_snapshot(BinderStatus::Active, 40.0, 10.0, 20.0);
        let mut work = work_for(&snap);
        update_work_progress(&mut work, &snap);
        assert_eq!((work.finished, work.in_progress), (0.25, 0.5));

        let empty = binder_snapshot(BinderStatus::Active, 0.0, 0.0, 0.0);
        update_work_progress(&mut work, &empty);
        assert_eq!((work.finished, work.in_progress), (0.0, 1.0));
    }

    #[test]
    fn test_recompute_totals() {
        let mut binder = Binder::new("b", "", "alice");
        let mut done = WorkItem::new(ObjectId::new(), WorkRef::Traveler);
        done.finished = 1.0;
        let mut half = WorkItem::new(ObjectId::new(), WorkRef::Traveler);
        half.in_progress = 0.5;
        binder.works = vec![done, half];

        assert!(recompute_binder_totals(&mut binder));
        assert_eq!(binder.total_value, 20.0);
        assert_eq!(binder.finished_value, 10.0);
        assert_eq!(binder.in_progress_value, 5.0);

        assert!(!recompute_binder_totals(&mut binder));
    }

    #[test]
    fn test_empty_binder_totals_are_zero() {
        let mut binder = Binder::new("b", "", "alice");
        assert!(!recompute_binder_totals(&mut binder));
        assert_eq!(binder.total_value, 0.0);
    }
}
