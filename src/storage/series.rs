/*
 *  storage/series.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bounded FIFO measurement history with crash-resilient save/load
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{BlobStore, StorageError};

/// Immutable, cheaply cloned copy of a series, oldest sample first.
pub type SeriesSnapshot = Arc<[f32]>;

/// On-disk shape of a series.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSeries {
    capacity: usize,
    samples: Vec<f32>,
}

/// Bounded, insertion-ordered numeric history.
///
/// A capacity of 0 keeps no history at all - used by tasks that only
/// publish a latest value.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingSeries {
    key: String,
    capacity: usize,
    samples: VecDeque<f32>,
}

impl RollingSeries {
    pub fn new(key: impl Into<String>, capacity: usize) -> Self {
        Self {
            key: key.into(),
            capacity,
            samples: VecDeque::with_capacity(capacity.min(4096)),
        }
    }

    /// Load the stored snapshot for `key`.
    ///
    /// Returns None when nothing usable is stored. A snapshot that does not
    /// deserialize is removed from the store so the next persist starts clean.
    /// A snapshot saved under a larger capacity keeps its newest samples.
    pub fn load(store: &dyn BlobStore, key: &str, capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        let bytes = match store.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("history {key}: unreadable ({e}), starting empty");
                return None;
            }
        };
        let stored: StoredSeries = match serde_json::from_slice(&bytes) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("history {key}: corrupt snapshot ({e}), discarding");
                if let Err(e) = store.remove(key) {
                    warn!("history {key}: could not remove corrupt snapshot: {e}");
                }
                return None;
            }
        };

        let mut series = Self::new(key, capacity);
        for value in stored.samples {
            series.append(value);
        }
        debug!("history {key}: restored {} samples", series.len());
        Some(series)
    }

    /// Load if a valid snapshot exists, else start empty.
    pub fn open(store: &dyn BlobStore, key: &str, capacity: usize) -> Self {
        Self::load(store, key, capacity).unwrap_or_else(|| Self::new(key, capacity))
    }

    /// Add to the tail, evicting the head when over capacity.
    pub fn append(&mut self, value: f32) {
        if self.capacity == 0 {
            return;
        }
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// Ordered copy for readers; the live series is never shared.
    pub fn snapshot(&self) -> SeriesSnapshot {
        self.samples.iter().copied().collect()
    }

    /// Serialize the whole series under its key.
    pub fn persist(&self, store: &dyn BlobStore) -> Result<(), StorageError> {
        let stored = StoredSeries {
            capacity: self.capacity,
            samples: self.samples.iter().copied().collect(),
        };
        let bytes = serde_json::to_vec(&stored)?;
        store.put(&self.key, &bytes)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<f32> {
        self.samples.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_keeps_most_recent_in_arrival_order() {
        for capacity in [1usize, 3, 10] {
            let mut series = RollingSeries::new("t", capacity);
            let n = capacity * 3 + 1;
            for i in 0..n {
                series.append(i as f32);
            }
            let expected: Vec<f32> = ((n - capacity)..n).map(|i| i as f32).collect();
            assert_eq!(series.len(), capacity);
            assert_eq!(series.snapshot().to_vec(), expected);
        }
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut series = RollingSeries::new("ping", 0);
        series.append(12.0);
        assert!(series.is_empty());

        let store = MemoryStore::new();
        series.persist(&store).unwrap();
        assert!(RollingSeries::load(&store, "ping", 0).is_none());
    }

    #[test]
    fn test_snapshot_is_detached_from_live_series() {
        let mut series = RollingSeries::new("t", 4);
        series.append(1.0);
        let snap = series.snapshot();
        series.append(2.0);
        assert_eq!(&snap[..], &[1.0]);
        assert_eq!(series.last(), Some(2.0));
    }

    #[test]
    fn test_persist_then_load_round_trip() {
        let store = MemoryStore::new();
        let mut series = RollingSeries::new("co2", 5);
        for v in [410.0, 415.5, 900.0, 1200.0] {
            series.append(v);
        }
        series.persist(&store).unwrap();

        let loaded = RollingSeries::load(&store, "co2", 5).expect("snapshot present");
        assert_eq!(loaded, series);
    }

    #[test]
    fn test_corrupt_snapshot_yields_empty_series() {
        let store = MemoryStore::new();
        store.put("co2", b"\x80\x04\x95 not json").unwrap();

        assert!(RollingSeries::load(&store, "co2", 5).is_none());
        assert!(!store.contains("co2"));

        let series = RollingSeries::open(&store, "co2", 5);
        assert!(series.is_empty());
        assert_eq!(series.capacity(), 5);
    }

    #[test]
    fn test_truncated_snapshot_is_treated_as_absent() {
        let store = MemoryStore::new();
        store.put("temp", br#"{"capacity":5,"samples":[1.0,2."#).unwrap();
        assert!(RollingSeries::open(&store, "temp", 5).is_empty());
    }

    #[test]
    fn test_smaller_capacity_keeps_newest() {
        let store = MemoryStore::new();
        let mut series = RollingSeries::new("hum", 10);
        for i in 0..10 {
            series.append(i as f32);
        }
        series.persist(&store).unwrap();

        let loaded = RollingSeries::open(&store, "hum", 3);
        assert_eq!(loaded.snapshot().to_vec(), vec![7.0, 8.0, 9.0]);
    }
}
