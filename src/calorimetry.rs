//! Mixing calorimetry.
//!
//! Heat exchanged between the hot and the cold body, per the mixing-calorimetry
//! law:
//!
//! ```text
//! Q_released = |m_hot  * c * (T_hot - T_mix)|
//! Q_absorbed = |m_cold * c * (T_mix - T_cold)|
//! ```
//!
//! Heat samples are computed once when a reading is ingested and are never
//! recomputed afterwards. What gets recorded depends on the experiment phase at
//! that instant:
//!
//! | Phase     | Recorded heat                                   |
//! |-----------|-------------------------------------------------|
//! | Measuring | 0 / 0                                           |
//! | Mixing    | computed from the reading and the live masses   |
//! | Finished  | carry-forward of the most recent recorded value |

use crate::error::{AppResult, CalorError};
use crate::experiment::state::ExperimentPhase;
use serde::{Deserialize, Serialize};

/// Specific heat capacity of water in J/(kg·°C).
pub const DEFAULT_SPECIFIC_HEAT: f64 = 4200.0;

/// Density of the cold water supply in kg/m³.
pub const DEFAULT_COLD_DENSITY: f64 = 1000.0;

/// Density of the hot water supply in kg/m³, as configured for the kit.
pub const DEFAULT_HOT_DENSITY: f64 = 480.0;

/// Default vessel volume in mL.
pub const DEFAULT_VOLUME_ML: f64 = 250.0;

const ML_PER_CUBIC_METRE: f64 = 1_000_000.0;

/// Heat values attached 1:1 to a stored reading, in joules.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeatSample {
    /// Heat released by the hot body
    pub q_released: f64,
    /// Heat absorbed by the cold body
    pub q_absorbed: f64,
}

impl HeatSample {
    /// The 0/0 sample recorded outside of mixing or when the result is indeterminate.
    pub const ZERO: HeatSample = HeatSample {
        q_released: 0.0,
        q_absorbed: 0.0,
    };
}

/// `mass = density * volume`, volume in mL, density in kg/m³, mass in kg.
pub fn mass_from_volume(density_kg_m3: f64, volume_ml: f64) -> f64 {
    density_kg_m3 * (volume_ml / ML_PER_CUBIC_METRE)
}

/// A water vessel whose mass follows its configured volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vessel {
    /// Volume in mL
    pub volume_ml: f64,
    /// Density in kg/m³
    pub density: f64,
}

impl Vessel {
    /// Vessel with the given density and volume.
    pub fn new(density: f64, volume_ml: f64) -> Self {
        Self { volume_ml, density }
    }

    /// The kit's cold vessel: 250 mL of water at 1000 kg/m³.
    pub fn default_cold() -> Self {
        Self::new(DEFAULT_COLD_DENSITY, DEFAULT_VOLUME_ML)
    }

    /// The kit's hot vessel: 250 mL at 480 kg/m³.
    pub fn default_hot() -> Self {
        Self::new(DEFAULT_HOT_DENSITY, DEFAULT_VOLUME_ML)
    }

    /// Mass in kg.
    pub fn mass_kg(&self) -> f64 {
        mass_from_volume(self.density, self.volume_ml)
    }
}

/// Cold and hot masses in kg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Masses {
    /// Cold water mass
    pub cold_kg: f64,
    /// Hot water mass
    pub hot_kg: f64,
}

impl Masses {
    /// Both masses strictly positive and finite.
    pub fn is_valid(&self) -> bool {
        [self.cold_kg, self.hot_kg]
            .iter()
            .all(|m| m.is_finite() && *m > 0.0)
    }
}

/// Effective Celsius temperatures of one reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperatures {
    /// Cold probe °C
    pub cold_c: f64,
    /// Hot probe °C
    pub hot_c: f64,
    /// Mixture probe °C
    pub mixture_c: f64,
}

/// Heat calculator bound to one specific heat capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calculator {
    specific_heat: f64,
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new(DEFAULT_SPECIFIC_HEAT)
    }
}

impl Calculator {
    /// Calculator using `specific_heat` J/(kg·°C).
    pub fn new(specific_heat: f64) -> Self {
        Self { specific_heat }
    }

    /// Specific heat in use.
    pub fn specific_heat(&self) -> f64 {
        self.specific_heat
    }

    /// Heat exchanged for one set of temperatures.
    ///
    /// Fails with [`CalorError::Indeterminate`] when either mass is non-positive.
    pub fn mixing_heat(&self, masses: Masses, temps: Temperatures) -> AppResult<HeatSample> {
        if !masses.is_valid() {
            return Err(CalorError::Indeterminate(format!(
                "masses must be positive (cold {} kg, hot {} kg)",
                masses.cold_kg, masses.hot_kg
            )));
        }
        Ok(HeatSample {
            q_released: (masses.hot_kg * self.specific_heat * (temps.hot_c - temps.mixture_c))
                .abs(),
            q_absorbed: (masses.cold_kg * self.specific_heat * (temps.mixture_c - temps.cold_c))
                .abs(),
        })
    }

    /// Heat sample to record for a reading ingested during `phase`.
    ///
    /// `previous` is the most recently recorded sample in the buffer, if any.
    pub fn sample_for(
        &self,
        phase: ExperimentPhase,
        masses: Masses,
        temps: Temperatures,
        previous: Option<HeatSample>,
    ) -> AppResult<HeatSample> {
        match phase {
            ExperimentPhase::Measuring => Ok(HeatSample::ZERO),
            ExperimentPhase::Mixing => self.mixing_heat(masses, temps),
            ExperimentPhase::Finished => Ok(previous.unwrap_or(HeatSample::ZERO)),
        }
    }
}
