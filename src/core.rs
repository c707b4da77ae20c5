//! The calorimeter core.
//!
//! [`Calorimeter`] owns the buffer store, the mode state and the lock state as one
//! unit. Every ingestion, every command and every snapshot goes through a method
//! on it, so whoever owns the `Calorimeter` (the actor in
//! [`crate::app_actor`]) serializes all of them. Reading the mode and appending
//! a reading therefore always happen in the same critical section.

use crate::calorimetry::{Calculator, HeatSample};
use crate::config::CalorConfig;
use crate::data::buffer::{BufferStore, Entry};
use crate::error::{AppResult, CalorError};
use crate::experiment::{substitute, ExperimentPhase, LockStatus, ModeState};
use crate::reading::{self, Reading};
use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};

pub use crate::experiment::Control;

/// What one accepted reading produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ingested {
    /// The stored row
    pub entry: Entry,
    /// Whether the oldest row was evicted to make room
    pub evicted: bool,
    /// Heat could not be computed and 0/0 was recorded
    pub indeterminate: bool,
}

/// Buffer store, mode state and lock state behind one owner.
#[derive(Debug, Clone)]
pub struct Calorimeter {
    buffer: BufferStore,
    mode: ModeState,
    lock: LockStatus,
    calculator: Calculator,
    sequence: u64,
}

impl Default for Calorimeter {
    fn default() -> Self {
        Self::new(BufferStore::default(), ModeState::default(), Calculator::default())
    }
}

impl Calorimeter {
    /// Assemble a calorimeter from its parts.
    pub fn new(buffer: BufferStore, mode: ModeState, calculator: Calculator) -> Self {
        Self {
            buffer,
            mode,
            lock: LockStatus::default(),
            calculator,
            sequence: 0,
        }
    }

    /// Build from configuration.
    pub fn from_config(config: &CalorConfig) -> Self {
        let cal = &config.calorimetry;
        Self::new(
            BufferStore::new(config.buffer.capacity),
            ModeState::new(cal.cold_vessel(), cal.hot_vessel()),
            Calculator::new(cal.specific_heat),
        )
    }

    /// Stored history.
    pub fn buffer(&self) -> &BufferStore {
        &self.buffer
    }

    /// Mode state.
    pub fn mode(&self) -> &ModeState {
        &self.mode
    }

    /// Lock state.
    pub fn lock_status(&self) -> &LockStatus {
        &self.lock
    }

    /// Current phase.
    pub fn phase(&self) -> ExperimentPhase {
        self.mode.phase()
    }

    /// Number of accepted mutations so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Validate a raw payload and ingest it.
    ///
    /// Malformed payloads are logged and dropped; the store is left unchanged.
    pub fn ingest_payload(&mut self, payload: &[u8], at: DateTime<Utc>) -> AppResult<Ingested> {
        match reading::validate(payload, at) {
            Ok(reading) => Ok(self.ingest(&reading)),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed payload");
                Err(e)
            }
        }
    }

    /// Ingest a validated reading under the current mode and lock state.
    pub fn ingest(&mut self, raw: &Reading) -> Ingested {
        let effective = substitute(raw, &self.lock, &self.mode);
        let previous = self.buffer.last_heat();

        let (heat, indeterminate) = match self.calculator.sample_for(
            self.mode.phase(),
            self.mode.masses(),
            effective.temperatures(),
            previous,
        ) {
            Ok(heat) => (heat, false),
            Err(e) => {
                tracing::warn!(error = %e, "Recording 0/0 heat for reading");
                (HeatSample::ZERO, true)
            }
        };

        let evicted = self.buffer.append(effective, heat).is_some();
        self.sequence += 1;
        tracing::debug!(
            phase = %self.mode.phase(),
            cold_c = effective.cold.c,
            hot_c = effective.hot.c,
            mixture_c = effective.mixture.c,
            q_released = heat.q_released,
            q_absorbed = heat.q_absorbed,
            len = self.buffer.len(),
            "Reading ingested"
        );

        Ingested {
            entry: Entry {
                reading: effective,
                heat,
            },
            evicted,
            indeterminate,
        }
    }

    /// Apply a presentation-side command.
    ///
    /// Captures are taken from the newest stored entry; `at` stamps a lock.
    pub fn apply(&mut self, control: Control, at: DateTime<Utc>) -> AppResult<()> {
        let newest = self.buffer.newest().map(|e| e.reading);
        let result = match control {
            Control::StartMixing => self.mode.start_mixing(),
            Control::StopAndLock => self.mode.stop_and_lock(newest.map(|r| r.mixture.c)),
            Control::Reset => self.mode.reset(),
            Control::Lock => self.lock.lock(
                newest.map(|r| (r.cold.c, r.hot.c)),
                self.buffer.appended(),
                at,
            ),
            Control::Unlock => self.lock.unlock(),
            Control::SetColdVolume(ml) => self.mode.set_cold_volume(ml),
            Control::SetHotVolume(ml) => self.mode.set_hot_volume(ml),
        };
        match &result {
            Ok(()) => self.sequence += 1,
            Err(e @ CalorError::InvalidTransition { .. }) => {
                tracing::warn!(error = %e, "Command rejected");
            }
            Err(e) => tracing::warn!(error = %e, %control, "Command failed"),
        }
        result
    }

    /// Immutable, consistent copy of history and state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            sequence: self.sequence,
            capacity: self.buffer.capacity(),
            series: self.buffer.snapshot_all(),
            mode: self.mode,
            lock: self.lock,
            specific_heat: self.calculator.specific_heat(),
        }
    }
}
