//! Bounded, insertion-ordered history of effective readings and heat samples.
//!
//! Each entry holds one reading's timestamp, the twelve unit values and the heat
//! sample recorded with it. Storing whole rows keeps every series the same length
//! by construction; [`BufferStore::snapshot_all`] fans the rows out into parallel
//! series for consumers.
//!
//! Once `capacity` entries are held, each append evicts the oldest entry first
//! (FIFO). Both happen inside one `&mut self` call, so no reader can observe one
//! without the other.

use crate::calorimetry::HeatSample;
use crate::experiment::EffectiveReading;
use crate::units::UnitValues;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of retained entries.
pub const DEFAULT_CAPACITY: usize = 100;

/// Minimum number of entries before [`BufferStore::latest`] reports data.
pub const MIN_READY_ENTRIES: usize = 2;

/// One stored row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Effective (post-substitution) reading
    pub reading: EffectiveReading,
    /// Heat recorded at ingestion
    pub heat: HeatSample,
}

/// Result of [`BufferStore::latest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Latest {
    /// Fewer than [`MIN_READY_ENTRIES`] entries are stored
    NotReady,
    /// Newest entry
    Ready(Entry),
}

impl Latest {
    /// The entry, if ready.
    pub fn entry(self) -> Option<Entry> {
        match self {
            Latest::Ready(entry) => Some(entry),
            Latest::NotReady => None,
        }
    }
}

/// Immutable copy of every series at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesSet {
    /// Insertion index of the oldest row
    pub first_index: u64,
    /// Capture instants
    pub timestamps: Vec<DateTime<Utc>>,
    /// Cold probe values
    pub cold: Vec<UnitValues>,
    /// Hot probe values
    pub hot: Vec<UnitValues>,
    /// Mixture probe values
    pub mixture: Vec<UnitValues>,
    /// Heat released per entry
    pub q_released: Vec<f64>,
    /// Heat absorbed per entry
    pub q_absorbed: Vec<f64>,
}

impl SeriesSet {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// No entries.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// All series have the same length.
    pub fn is_aligned(&self) -> bool {
        let n = self.timestamps.len();
        [
            self.cold.len(),
            self.hot.len(),
            self.mixture.len(),
            self.q_released.len(),
            self.q_absorbed.len(),
        ]
        .iter()
        .all(|len| *len == n)
    }
}

/// Fixed-capacity ring of [`Entry`] rows.
#[derive(Debug, Clone)]
pub struct BufferStore {
    entries: VecDeque<Entry>,
    capacity: usize,
    appended: u64,
}

impl Default for BufferStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BufferStore {
    /// Empty store holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            appended: 0,
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entries stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insertion index the next appended entry will receive.
    ///
    /// Counts every append since construction, so it keeps growing after
    /// eviction starts.
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Append a row, evicting the oldest one when full.
    ///
    /// Returns the evicted entry, if any.
    pub fn append(&mut self, reading: EffectiveReading, heat: HeatSample) -> Option<Entry> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(Entry { reading, heat });
        self.appended += 1;
        evicted
    }

    /// Newest entry, or `NotReady` while fewer than two entries exist.
    pub fn latest(&self) -> Latest {
        if self.entries.len() < MIN_READY_ENTRIES {
            return Latest::NotReady;
        }
        self.entries
            .back()
            .copied()
            .map_or(Latest::NotReady, Latest::Ready)
    }

    /// Newest entry regardless of readiness.
    pub fn newest(&self) -> Option<&Entry> {
        self.entries.back()
    }

    /// Most recently recorded heat sample.
    pub fn last_heat(&self) -> Option<HeatSample> {
        self.entries.back().map(|e| e.heat)
    }

    /// Entries oldest-first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Entry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Copy every series out.
    pub fn snapshot_all(&self) -> SeriesSet {
        let n = self.entries.len();
        let mut set = SeriesSet {
            first_index: self.appended - n as u64,
            timestamps: Vec::with_capacity(n),
            cold: Vec::with_capacity(n),
            hot: Vec::with_capacity(n),
            mixture: Vec::with_capacity(n),
            q_released: Vec::with_capacity(n),
            q_absorbed: Vec::with_capacity(n),
        };
        for entry in &self.entries {
            set.timestamps.push(entry.reading.timestamp);
            set.cold.push(entry.reading.cold);
            set.hot.push(entry.reading.hot);
            set.mixture.push(entry.reading.mixture);
            set.q_released.push(entry.heat.q_released);
            set.q_absorbed.push(entry.heat.q_absorbed);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(i: i64) -> (EffectiveReading, HeatSample) {
        let c = i as f64;
        (
            EffectiveReading {
                timestamp: Utc.timestamp_opt(1_700_000_000 + i, 0).single().unwrap(),
                cold: UnitValues::from_celsius(c),
                hot: UnitValues::from_celsius(c + 50.0),
                mixture: UnitValues::from_celsius(c + 20.0),
            },
            HeatSample {
                q_released: c * 10.0,
                q_absorbed: c * 5.0,
            },
        )
    }

    #[test]
    fn test_latest_requires_two_entries() {
        let mut store = BufferStore::new(4);
        assert_eq!(store.latest(), Latest::NotReady);

        let (r, h) = row(1);
        store.append(r, h);
        assert_eq!(store.latest(), Latest::NotReady);
        assert_eq!(store.newest().map(|e| e.reading.cold.c), Some(1.0));

        let (r, h) = row(2);
        store.append(r, h);
        let latest = store.latest().entry().unwrap();
        assert_eq!(latest.reading.cold.c, 2.0);
        assert_eq!(latest.heat.q_released, 20.0);
    }

    #[test]
    fn test_eviction_is_fifo() {
        let mut store = BufferStore::new(3);
        let mut evicted = Vec::new();
        for i in 0..5 {
            let (r, h) = row(i);
            if let Some(e) = store.append(r, h) {
                evicted.push(e.reading.cold.c);
            }
        }
        assert_eq!(evicted, vec![0.0, 1.0]);
        let kept: Vec<f64> = store.iter().map(|e| e.reading.cold.c).collect();
        assert_eq!(kept, vec![2.0, 3.0, 4.0]);
        assert_eq!(store.appended(), 5);
        assert_eq!(store.snapshot_all().first_index, 2);
    }

    #[test]
    fn test_snapshot_all_is_aligned_copy() {
        let mut store = BufferStore::new(10);
        for i in 0..4 {
            let (r, h) = row(i);
            store.append(r, h);
        }
        let snap = store.snapshot_all();
        assert_eq!(snap.len(), 4);
        assert!(snap.is_aligned());
        assert_eq!(snap.q_absorbed, vec![0.0, 5.0, 10.0, 15.0]);

        // The copy does not follow later appends.
        let (r, h) = row(9);
        store.append(r, h);
        assert_eq!(snap.len(), 4);
        assert_eq!(store.last_heat().map(|h| h.q_released), Some(90.0));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut store = BufferStore::new(0);
        assert_eq!(store.capacity(), 1);
        let (r, h) = row(1);
        store.append(r, h);
        let (r, h) = row(2);
        assert!(store.append(r, h).is_some());
        assert_eq!(store.len(), 1);
    }
}
