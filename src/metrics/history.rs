use std::collections::{HashMap, VecDeque};

use super::provider::ServiceSnapshot;

const DEFAULT_RETENTION_SECS: u64 = 3600;

/// Recent snapshots per service, kept in memory for detectors that look at
/// consecutive ticks (sustained CPU breach).
#[derive(Debug)]
pub struct SnapshotHistory {
    capacity: usize,
    per_service: HashMap<String, VecDeque<ServiceSnapshot>>,
}

impl SnapshotHistory {
    pub fn with_monitor_interval_secs(monitor_interval_secs: u64) -> Self {
        Self::with_retention_secs(monitor_interval_secs, DEFAULT_RETENTION_SECS)
    }

    pub fn with_retention_secs(monitor_interval_secs: u64, retention_secs: u64) -> Self {
        let capacity = if monitor_interval_secs == 0 {
            1
        } else {
            (retention_secs / monitor_interval_secs).max(1)
        } as usize;

        Self {
            capacity,
            per_service: HashMap::new(),
        }
    }

    pub fn push(&mut self, snapshot: ServiceSnapshot) {
        let entries = self
            .per_service
            .entry(snapshot.service.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity.min(512)));
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(snapshot);
    }

    /// Most recent `count` snapshots, oldest first. Excludes the snapshot
    /// being evaluated in the current tick only if it has not been pushed yet.
    pub fn recent(&self, service: &str, count: usize) -> Vec<ServiceSnapshot> {
        let Some(entries) = self.per_service.get(service) else {
            return Vec::new();
        };
        let skip = entries.len().saturating_sub(count);
        entries.iter().skip(skip).cloned().collect()
    }
}
