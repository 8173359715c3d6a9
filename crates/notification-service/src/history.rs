//! Bounded record of recent deliveries.

use std::collections::VecDeque;
use std::sync::Arc;

use events::DeliveryRecord;
use tokio::sync::RwLock;

/// Capacity used by [`DeliveryHistory::default`].
pub const DEFAULT_CAPACITY: usize = 100;

/// Most recent deliveries, oldest first.
///
/// Holds at most `capacity` records; recording past capacity evicts the
/// oldest entry. Purely diagnostic: nothing survives a restart.
#[derive(Clone)]
pub struct DeliveryHistory {
    records: Arc<RwLock<VecDeque<DeliveryRecord>>>,
    capacity: usize,
}

impl DeliveryHistory {
    /// Creates an empty history holding up to `capacity` records (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a record, evicting the oldest ones beyond capacity.
    pub async fn record(&self, record: DeliveryRecord) {
        let mut records = self.records.write().await;
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    /// Returns the stored records, oldest first.
    pub async fn snapshot(&self) -> Vec<DeliveryRecord> {
        self.records.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for DeliveryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
