//! Snapshots for the presentation layer.
//!
//! A [`Snapshot`] is an owned copy of the full history and of the mode/lock state,
//! taken in one step by [`crate::core::Calorimeter::snapshot`]. Consumers render
//! from it without reaching back into shared state and without re-deriving any
//! substituted or masked value.
//!
//! Masking is a display hint only: while the lock is engaged, rows captured at or
//! after the lock instant render their cold/hot cells as not-available, even
//! though the store holds the substituted locked values for them.

use crate::calorimetry::Masses;
use crate::data::buffer::SeriesSet;
use crate::error::AppResult;
use crate::experiment::{ExperimentPhase, LockState, LockStatus, ModeState};
use crate::reading::Probe;
use crate::units::{Unit, UnitValues};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Display precision timestamp, local wall clock.
pub fn display_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// Headers of the exported display table.
pub const TABLE_HEADERS: [&str; 15] = [
    "Waktu",
    "Dingin °C",
    "Dingin °F",
    "Dingin K",
    "Dingin °R",
    "Panas °C",
    "Panas °F",
    "Panas K",
    "Panas °R",
    "Campuran °C",
    "Campuran °F",
    "Campuran K",
    "Campuran °R",
    "Q Lepas (J)",
    "Q Terima (J)",
];

/// Atomic copy of history plus mode and lock descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of mutations applied before this copy was taken
    pub sequence: u64,
    /// Buffer capacity
    pub capacity: usize,
    /// Stored series
    #[serde(flatten)]
    pub series: SeriesSet,
    /// Phase, frozen mixture temperature and vessels
    pub mode: ModeState,
    /// Lock state and captured values
    pub lock: LockStatus,
    /// Specific heat in use, J/(kg·°C)
    pub specific_heat: f64,
}

/// One table row, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    /// Capture instant
    pub timestamp: DateTime<Utc>,
    /// Cold probe, `None` when masked
    pub cold: Option<UnitValues>,
    /// Hot probe, `None` when masked
    pub hot: Option<UnitValues>,
    /// Mixture probe
    pub mixture: UnitValues,
    /// Heat released
    pub q_released: f64,
    /// Heat absorbed
    pub q_absorbed: f64,
}

impl DisplayRow {
    /// Values for one probe, `None` when masked.
    pub fn probe(&self, probe: Probe) -> Option<UnitValues> {
        match probe {
            Probe::Cold => self.cold,
            Probe::Hot => self.hot,
            Probe::Mixture => Some(self.mixture),
        }
    }

    /// Row formatted as table cells (masked cells render as `-`).
    pub fn cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(TABLE_HEADERS.len());
        cells.push(display_time(self.timestamp));
        for probe in Probe::ALL {
            match self.probe(probe) {
                Some(values) => {
                    cells.extend(Unit::ALL.iter().map(|u| format!("{:.2}", values.get(*u))))
                }
                None => cells.extend(std::iter::repeat("-".to_string()).take(Unit::ALL.len())),
            }
        }
        cells.push(format!("{:.2}", self.q_released));
        cells.push(format!("{:.2}", self.q_absorbed));
        cells
    }
}

/// Live indicator values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Live {
    /// Fewer than two entries, or a vessel mass is not positive
    NotReady,
    /// Values for the indicator cards
    Ready {
        /// Newest cold °C
        cold_c: f64,
        /// Newest hot °C
        hot_c: f64,
        /// Newest mixture °C (the frozen value once finished)
        mixture_c: f64,
        /// Most recently recorded heat released
        q_released: f64,
        /// Most recently recorded heat absorbed
        q_absorbed: f64,
    },
}

impl Snapshot {
    /// Current phase.
    pub fn phase(&self) -> ExperimentPhase {
        self.mode.phase()
    }

    /// Current lock state.
    pub fn lock_state(&self) -> LockState {
        self.lock.state()
    }

    /// Masses at the time of the snapshot.
    pub fn masses(&self) -> Masses {
        self.mode.masses()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// No stored entries.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Display rows, newest first, with lock masking applied.
    pub fn rows(&self) -> Vec<DisplayRow> {
        let s = &self.series;
        (0..s.len())
            .rev()
            .map(|i| {
                let masked = self.lock.masks(s.first_index + i as u64);
                DisplayRow {
                    timestamp: s.timestamps[i],
                    cold: (!masked).then_some(s.cold[i]),
                    hot: (!masked).then_some(s.hot[i]),
                    mixture: s.mixture[i],
                    q_released: s.q_released[i],
                    q_absorbed: s.q_absorbed[i],
                }
            })
            .collect()
    }

    /// Values for the live indicator cards.
    pub fn live(&self) -> Live {
        let s = &self.series;
        if s.len() < crate::data::buffer::MIN_READY_ENTRIES || !self.masses().is_valid() {
            return Live::NotReady;
        }
        let last = s.len() - 1;
        Live::Ready {
            cold_c: s.cold[last].c,
            hot_c: s.hot[last].c,
            mixture_c: self.mode.frozen_mixture_c().unwrap_or(s.mixture[last].c),
            q_released: s.q_released[last],
            q_absorbed: s.q_absorbed[last],
        }
    }

    /// One-line status summary.
    pub fn status_line(&self, topic: &str) -> String {
        let lock_label = match self.lock_state() {
            LockState::Locked => "INITIAL TEMPERATURES LOCKED",
            LockState::Unlocked => "INITIAL TEMPERATURES LIVE",
        };
        match (self.live(), self.series.timestamps.last()) {
            (
                Live::Ready {
                    cold_c,
                    hot_c,
                    mixture_c,
                    ..
                },
                Some(last),
            ) => format!(
                "{topic} | {} | {lock_label} | Last: {} | Cold: {cold_c:.1}°C | Hot: {hot_c:.1}°C | Mixture: {mixture_c:.1}°C",
                self.phase().label(),
                display_time(*last),
            ),
            _ => format!(
                "{topic} | {} | {lock_label} | Waiting for probe data or a valid volume (>0)",
                self.phase().label()
            ),
        }
    }

    /// Write the display table as CSV.
    #[cfg(feature = "storage_csv")]
    pub fn export_table<W: std::io::Write>(&self, writer: W) -> AppResult<()> {
        let map = |e: csv::Error| crate::error::CalorError::PersistenceUnavailable(e.to_string());
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(TABLE_HEADERS).map_err(map)?;
        for row in self.rows() {
            csv.write_record(row.cells()).map_err(map)?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Write the display table as CSV.
    #[cfg(not(feature = "storage_csv"))]
    pub fn export_table<W: std::io::Write>(&self, _writer: W) -> AppResult<()> {
        Err(crate::error::CalorError::PersistenceUnavailable(
            "table export requires the storage_csv feature".into(),
        ))
    }

    /// Pretty-printed JSON dump of the whole snapshot.
    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calorimetry::HeatSample;
    use crate::data::buffer::BufferStore;
    use crate::experiment::EffectiveReading;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().unwrap()
    }

    fn snapshot_with(rows: &[(i64, f64)], lock: LockStatus, mode: ModeState) -> Snapshot {
        let mut store = BufferStore::new(10);
        for (secs, c) in rows {
            store.append(
                EffectiveReading {
                    timestamp: at(*secs),
                    cold: UnitValues::from_celsius(*c),
                    hot: UnitValues::from_celsius(c + 60.0),
                    mixture: UnitValues::from_celsius(c + 20.0),
                },
                HeatSample {
                    q_released: *c,
                    q_absorbed: c / 2.0,
                },
            );
        }
        Snapshot {
            sequence: rows.len() as u64,
            capacity: store.capacity(),
            series: store.snapshot_all(),
            mode,
            lock,
            specific_heat: 4200.0,
        }
    }

    #[test]
    fn test_rows_newest_first_and_masked_after_lock() {
        let mut lock = LockStatus::default();
        lock.lock(Some((10.0, 70.0)), 2, at(2)).unwrap();
        let snap = snapshot_with(&[(0, 10.0), (1, 11.0), (2, 12.0), (3, 13.0)], lock, ModeState::default());

        let rows = snap.rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].timestamp, at(3));
        assert!(rows[0].cold.is_none() && rows[0].hot.is_none());
        assert!(rows[1].cold.is_none(), "first row appended under the lock is masked");
        assert_eq!(rows[2].cold.map(|v| v.c), Some(11.0));
        assert_eq!(rows[3].hot.map(|v| v.c), Some(70.0));
        assert_eq!(rows[0].mixture.c, 33.0);

        let cells = rows[0].cells();
        assert_eq!(cells.len(), TABLE_HEADERS.len());
        assert_eq!(&cells[1..9], &["-"; 8]);
        assert_eq!(cells[9], "33.00");
    }

    #[test]
    fn test_live_not_ready() {
        let snap = snapshot_with(&[(0, 10.0)], LockStatus::default(), ModeState::default());
        assert_eq!(snap.live(), Live::NotReady);
        assert!(snap.status_line("edukit/suhu").contains("Waiting"));

        let mut mode = ModeState::default();
        mode.set_cold_volume(0.0).unwrap();
        let snap = snapshot_with(&[(0, 10.0), (1, 11.0)], LockStatus::default(), mode);
        assert_eq!(snap.live(), Live::NotReady);
    }

    #[test]
    fn test_live_uses_frozen_mixture() {
        let mut mode = ModeState::default();
        mode.start_mixing().unwrap();
        mode.stop_and_lock(Some(29.5)).unwrap();
        let snap = snapshot_with(&[(0, 10.0), (1, 12.0)], LockStatus::default(), mode);
        match snap.live() {
            Live::Ready {
                mixture_c,
                q_released,
                ..
            } => {
                assert_eq!(mixture_c, 29.5);
                assert_eq!(q_released, 12.0);
            }
            Live::NotReady => panic!("expected ready"),
        }
        let line = snap.status_line("edukit/suhu");
        assert!(line.starts_with("edukit/suhu | FINISHED"));
        assert!(line.contains("Mixture: 29.5°C"));
    }

    #[cfg(feature = "storage_csv")]
    #[test]
    fn test_export_table() {
        let snap = snapshot_with(&[(0, 10.0), (1, 11.0)], LockStatus::default(), ModeState::default());
        let mut out = Vec::new();
        snap.export_table(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Waktu,Dingin °C"));
        assert!(lines[1].ends_with("11.00,5.50"));
    }

    #[test]
    fn test_json_dump_restores() {
        let mut lock = LockStatus::default();
        lock.lock(Some((10.0, 70.0)), 1, at(1)).unwrap();
        let snap = snapshot_with(&[(0, 10.0), (1, 11.0)], lock, ModeState::default());

        let text = snap.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["first_index"], 0);
        assert_eq!(value["specific_heat"], 4200.0);

        let restored: Snapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(restored, snap);
        assert_eq!(restored.rows()[0].cold, None);
    }
}
