//! Experiment phase and lock state management.
//!
//! Two orthogonal axes, both driven only by external commands:
//!
//! ```text
//! Phase:   Measuring ──start-mixing──> Mixing ──stop-and-lock──> Finished
//!              ▲                                                    │
//!              └──────────────────────── reset ─────────────────────┘
//!
//! Lock:    Unlocked ──lock──> Locked ──unlock──> Unlocked
//! ```
//!
//! Commands issued in a state without a listed transition fail with
//! [`CalorError::InvalidTransition`] and leave the state untouched. Values that
//! a transition captures (frozen mixture temperature, locked cold/hot
//! temperatures) are supplied by the caller from the buffer store so that the
//! capture and the transition happen in the same critical section.

use crate::calorimetry::{Masses, Vessel};
use crate::error::{AppResult, CalorError, TransitionOrigin};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Experiment phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExperimentPhase {
    /// Initial temperatures are being measured, no heat is recorded
    #[default]
    Measuring,
    /// Hot and cold water are mixing, heat is computed per reading
    Mixing,
    /// Result is frozen
    Finished,
}

impl std::fmt::Display for ExperimentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExperimentPhase::Measuring => write!(f, "measuring"),
            ExperimentPhase::Mixing => write!(f, "mixing"),
            ExperimentPhase::Finished => write!(f, "finished"),
        }
    }
}

impl ExperimentPhase {
    /// Check if the phase allows starting to mix.
    pub fn can_start_mixing(&self) -> bool {
        matches!(self, ExperimentPhase::Measuring)
    }

    /// Check if the phase allows stopping and locking the result.
    pub fn can_stop(&self) -> bool {
        matches!(self, ExperimentPhase::Mixing)
    }

    /// Check if the phase allows a reset.
    pub fn can_reset(&self) -> bool {
        matches!(self, ExperimentPhase::Finished)
    }

    /// Operator-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            ExperimentPhase::Measuring => "INITIAL MEASUREMENT",
            ExperimentPhase::Mixing => "MIXING IN PROGRESS",
            ExperimentPhase::Finished => "FINISHED (RESULT LOCKED)",
        }
    }
}

/// Lock sub-state of the initial cold/hot temperatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LockState {
    /// Cold/hot probes are live
    #[default]
    Unlocked,
    /// Cold/hot probes are substituted by captured values
    Locked,
}

impl std::fmt::Display for LockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockState::Unlocked => write!(f, "unlocked"),
            LockState::Locked => write!(f, "locked"),
        }
    }
}

/// Commands issued by the presentation side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Control {
    /// Measuring -> Mixing
    StartMixing,
    /// Mixing -> Finished
    StopAndLock,
    /// Finished -> Measuring
    Reset,
    /// Capture cold/hot temperatures
    Lock,
    /// Release the captured temperatures
    Unlock,
    /// Cold vessel volume in mL.
    ///
    /// Fails with [`CalorError::InvalidParameter`] for NaN or infinite volumes.
    SetColdVolume(f64),
    /// Hot vessel volume in mL.
    ///
    /// Fails with [`CalorError::InvalidParameter`] for NaN or infinite volumes.
    SetHotVolume(f64),
}

impl std::fmt::Display for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Control::StartMixing => f.write_str("start-mixing"),
            Control::StopAndLock => f.write_str("stop-and-lock"),
            Control::Reset => f.write_str("reset"),
            Control::Lock => f.write_str("lock"),
            Control::Unlock => f.write_str("unlock"),
            Control::SetColdVolume(ml) => write!(f, "set-cold-volume({ml} mL)"),
            Control::SetHotVolume(ml) => write!(f, "set-hot-volume({ml} mL)"),
        }
    }
}

/// Temperatures captured when the lock engaged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LockCapture {
    /// Captured cold probe °C
    pub cold_c: f64,
    /// Captured hot probe °C
    pub hot_c: f64,
    /// When the lock engaged
    pub locked_at: DateTime<Utc>,
    /// Insertion index of the first reading appended under the lock
    pub from_index: u64,
}

/// The lock axis and its captured values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LockStatus {
    capture: Option<LockCapture>,
}

impl LockStatus {
    /// Current lock state.
    pub fn state(&self) -> LockState {
        if self.capture.is_some() {
            LockState::Locked
        } else {
            LockState::Unlocked
        }
    }

    /// Captured values while locked.
    pub fn capture(&self) -> Option<&LockCapture> {
        self.capture.as_ref()
    }

    /// Whether the row with insertion index `index` is masked for display.
    ///
    /// Rows appended after the lock engaged are masked whatever their
    /// timestamps say.
    pub fn masks(&self, index: u64) -> bool {
        self.capture.is_some_and(|c| index >= c.from_index)
    }

    /// Engage the lock with temperatures taken from the newest stored reading.
    ///
    /// `next_index` is the insertion index the next appended reading will get.
    pub fn lock(
        &mut self,
        newest: Option<(f64, f64)>,
        next_index: u64,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.capture.is_some() {
            return Err(self.rejected(Control::Lock, None));
        }
        let (cold_c, hot_c) =
            newest.ok_or_else(|| self.rejected(Control::Lock, Some("no reading to capture")))?;
        self.capture = Some(LockCapture {
            cold_c,
            hot_c,
            locked_at: at,
            from_index: next_index,
        });
        tracing::info!(cold_c, hot_c, "Initial temperatures locked");
        Ok(())
    }

    /// Release the lock and clear the captured values.
    pub fn unlock(&mut self) -> AppResult<()> {
        if self.capture.take().is_none() {
            return Err(self.rejected(Control::Unlock, None));
        }
        tracing::info!("Initial temperatures unlocked");
        Ok(())
    }

    fn rejected(&self, command: Control, reason: Option<&'static str>) -> CalorError {
        CalorError::InvalidTransition {
            from: TransitionOrigin::Lock(self.state()),
            command,
            reason,
        }
    }
}

/// Experiment phase plus the operands the calculator needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeState {
    phase: ExperimentPhase,
    frozen_mixture_c: Option<f64>,
    cold: Vessel,
    hot: Vessel,
}

impl Default for ModeState {
    fn default() -> Self {
        Self::new(Vessel::default_cold(), Vessel::default_hot())
    }
}

impl ModeState {
    /// Fresh state in `Measuring` with the given vessels.
    pub fn new(cold: Vessel, hot: Vessel) -> Self {
        Self {
            phase: ExperimentPhase::Measuring,
            frozen_mixture_c: None,
            cold,
            hot,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ExperimentPhase {
        self.phase
    }

    /// Mixture °C captured at the Mixing -> Finished transition.
    pub fn frozen_mixture_c(&self) -> Option<f64> {
        self.frozen_mixture_c
    }

    /// Cold vessel.
    pub fn cold(&self) -> Vessel {
        self.cold
    }

    /// Hot vessel.
    pub fn hot(&self) -> Vessel {
        self.hot
    }

    /// Live masses derived from the vessels.
    pub fn masses(&self) -> Masses {
        Masses {
            cold_kg: self.cold.mass_kg(),
            hot_kg: self.hot.mass_kg(),
        }
    }

    /// Measuring -> Mixing. Does not require any buffered data.
    pub fn start_mixing(&mut self) -> AppResult<()> {
        if !self.phase.can_start_mixing() {
            return Err(self.rejected(Control::StartMixing, None));
        }
        self.phase = ExperimentPhase::Mixing;
        let masses = self.masses();
        tracing::info!(
            cold_kg = masses.cold_kg,
            hot_kg = masses.hot_kg,
            "Mixing started"
        );
        Ok(())
    }

    /// Mixing -> Finished, freezing the newest stored mixture temperature.
    pub fn stop_and_lock(&mut self, newest_mixture_c: Option<f64>) -> AppResult<()> {
        if !self.phase.can_stop() {
            return Err(self.rejected(Control::StopAndLock, None));
        }
        let frozen = newest_mixture_c
            .ok_or_else(|| self.rejected(Control::StopAndLock, Some("no reading to capture")))?;
        self.phase = ExperimentPhase::Finished;
        self.frozen_mixture_c = Some(frozen);
        tracing::info!(mixture_c = frozen, "Mixing stopped, result locked");
        Ok(())
    }

    /// Finished -> Measuring, clearing the frozen mixture temperature.
    pub fn reset(&mut self) -> AppResult<()> {
        if !self.phase.can_reset() {
            return Err(self.rejected(Control::Reset, None));
        }
        self.phase = ExperimentPhase::Measuring;
        self.frozen_mixture_c = None;
        tracing::info!("Experiment reset to initial measurement");
        Ok(())
    }

    /// Update the cold vessel volume. Applies to the very next reading.
    pub fn set_cold_volume(&mut self, volume_ml: f64) -> AppResult<()> {
        check_volume(Control::SetColdVolume(volume_ml), volume_ml)?;
        self.cold.volume_ml = volume_ml;
        tracing::debug!(volume_ml, mass_kg = self.cold.mass_kg(), "Cold volume updated");
        Ok(())
    }

    /// Update the hot vessel volume. Applies to the very next reading.
    pub fn set_hot_volume(&mut self, volume_ml: f64) -> AppResult<()> {
        check_volume(Control::SetHotVolume(volume_ml), volume_ml)?;
        self.hot.volume_ml = volume_ml;
        tracing::debug!(volume_ml, mass_kg = self.hot.mass_kg(), "Hot volume updated");
        Ok(())
    }

    fn rejected(&self, command: Control, reason: Option<&'static str>) -> CalorError {
        CalorError::InvalidTransition {
            from: TransitionOrigin::Phase(self.phase),
            command,
            reason,
        }
    }
}

// Non-positive volumes are accepted; the calculator reports them as indeterminate.
fn check_volume(command: Control, volume_ml: f64) -> AppResult<()> {
    crate::validation::is_finite(volume_ml)
        .map_err(|msg| CalorError::InvalidParameter(format!("{command}: {msg}")))
}
