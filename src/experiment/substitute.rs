//! Substitution of locked and frozen probe values.
//!
//! Applied once per ingested reading, inside the same critical section as the
//! append, so the stored history reflects the mode active at ingestion time.

use crate::calorimetry::Temperatures;
use crate::experiment::state::{LockStatus, ModeState};
use crate::reading::Reading;
use crate::units::UnitValues;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reading as it will be stored: every probe derived from one Celsius value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveReading {
    /// Capture instant
    pub timestamp: DateTime<Utc>,
    /// Cold probe
    pub cold: UnitValues,
    /// Hot probe
    pub hot: UnitValues,
    /// Mixture probe
    pub mixture: UnitValues,
}

impl EffectiveReading {
    /// Celsius operands for the calculator.
    pub fn temperatures(&self) -> Temperatures {
        Temperatures {
            cold_c: self.cold.c,
            hot_c: self.hot.c,
            mixture_c: self.mixture.c,
        }
    }
}

/// Compute the effective reading.
///
/// - Locked: cold/hot Celsius come from the lock capture.
/// - Finished: mixture Celsius is the frozen value.
/// - Otherwise the payload's Celsius is used.
///
/// F/K/R are always re-derived from the chosen Celsius.
pub fn substitute(raw: &Reading, lock: &LockStatus, mode: &ModeState) -> EffectiveReading {
    let (cold_c, hot_c) = match lock.capture() {
        Some(capture) => (capture.cold_c, capture.hot_c),
        None => (raw.cold.c, raw.hot.c),
    };
    let mixture_c = mode.frozen_mixture_c().unwrap_or(raw.mixture.c);

    EffectiveReading {
        timestamp: raw.timestamp,
        cold: UnitValues::from_celsius(cold_c),
        hot: UnitValues::from_celsius(hot_c),
        mixture: UnitValues::from_celsius(mixture_c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(cold: f64, hot: f64, mixture: f64) -> Reading {
        Reading {
            timestamp: Utc::now(),
            cold: UnitValues::from_celsius(cold),
            hot: UnitValues::from_celsius(hot),
            mixture: UnitValues::from_celsius(mixture),
        }
    }

    #[test]
    fn passthrough_when_unlocked_and_live() {
        let r = raw(12.0, 75.0, 40.0);
        let eff = substitute(&r, &LockStatus::default(), &ModeState::default());
        assert_eq!(eff.cold.c, 12.0);
        assert_eq!(eff.hot.c, 75.0);
        assert_eq!(eff.mixture.c, 40.0);
    }

    #[test]
    fn lock_replaces_all_cold_hot_units() {
        let mut lock = LockStatus::default();
        lock.lock(Some((10.0, 80.0)), 0, Utc::now()).unwrap();
        let eff = substitute(&raw(14.0, 60.0, 35.0), &lock, &ModeState::default());
        assert_eq!(eff.cold, UnitValues::from_celsius(10.0));
        assert_eq!(eff.hot, UnitValues::from_celsius(80.0));
        assert_eq!(eff.mixture.c, 35.0);
    }

    #[test]
    fn finished_freezes_mixture() {
        let mut mode = ModeState::default();
        mode.start_mixing().unwrap();
        mode.stop_and_lock(Some(33.0)).unwrap();
        let eff = substitute(&raw(14.0, 60.0, 25.0), &LockStatus::default(), &mode);
        assert_eq!(eff.mixture, UnitValues::from_celsius(33.0));
        assert_eq!(eff.cold.c, 14.0);
    }

    #[test]
    fn reported_fkr_is_not_trusted() {
        let mut r = raw(20.0, 70.0, 30.0);
        r.cold.f = 999.0;
        let eff = substitute(&r, &LockStatus::default(), &ModeState::default());
        assert_eq!(eff.cold, UnitValues::from_celsius(20.0));
    }
}
