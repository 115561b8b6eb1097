use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::StreamRecord;

/// One published batch. `records` is shared, never edited in place.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub records: Arc<Vec<StreamRecord>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Holds the current schedule and notifies subscribers when it is swapped.
#[derive(Debug)]
pub struct ScheduleCache {
    tx: watch::Sender<Snapshot>,
}

impl Default for ScheduleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleCache {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    pub fn records(&self) -> Arc<Vec<StreamRecord>> {
        self.tx.borrow().records.clone()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.tx.borrow().updated_at
    }

    /// Receiver that wakes on every replacement.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    /// Publish a whole new batch. Readers see either the old or the new list.
    pub fn replace(&self, records: Vec<StreamRecord>, at: DateTime<Utc>) {
        self.tx.send_replace(Snapshot {
            records: Arc::new(records),
            updated_at: Some(at),
        });
    }
}
