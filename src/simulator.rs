//! Simulated three-probe rig.
//!
//! Stands in for the physical kit in demos and tests. The cold and hot probes
//! sit near 10 °C and 80 °C. Before mixing the mixture probe reads room
//! temperature; once mixing starts it relaxes toward the equilibrium set by the
//! two vessel masses. All noise comes from a seeded RNG so runs are repeatable.
//!
//! # Example
//!
//! ```
//! use calor_daq::simulator::ProbeRig;
//!
//! let mut rig = ProbeRig::new(42);
//! let payload = rig.next_payload();
//! assert!(calor_daq::reading::validate(&payload, chrono::Utc::now()).is_ok());
//! ```

use crate::calorimetry::Vessel;
use crate::reading::Probe;
use crate::units::{Unit, UnitValues};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

/// Cold bath set point, °C
pub const COLD_SET_POINT: f64 = 10.0;
/// Hot bath set point, °C
pub const HOT_SET_POINT: f64 = 80.0;
/// Reading of the empty mixing vessel, °C
pub const ROOM_TEMPERATURE: f64 = 25.0;
/// Fraction of the remaining gap to equilibrium closed per step while mixing
pub const MIXING_RELAXATION: f64 = 0.35;

/// Mock rig producing wire payloads.
#[derive(Debug, Clone)]
pub struct ProbeRig {
    rng: StdRng,
    cold: Vessel,
    hot: Vessel,
    cold_c: f64,
    hot_c: f64,
    mixture_c: f64,
    mixing: bool,
    noise: f64,
}

impl ProbeRig {
    /// Rig with the kit's stock vessels.
    pub fn new(seed: u64) -> Self {
        Self::with_vessels(seed, Vessel::default_cold(), Vessel::default_hot())
    }

    /// Rig whose equilibrium follows the given vessels.
    pub fn with_vessels(seed: u64, cold: Vessel, hot: Vessel) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            cold,
            hot,
            cold_c: COLD_SET_POINT,
            hot_c: HOT_SET_POINT,
            mixture_c: ROOM_TEMPERATURE,
            mixing: false,
            noise: 0.05,
        }
    }

    /// Peak uniform noise added to every probe, °C.
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.abs();
        self
    }

    /// Pour the vessels together.
    pub fn start_mixing(&mut self) {
        self.mixing = true;
    }

    /// Refill the baths and empty the mixing vessel.
    pub fn reset(&mut self) {
        self.mixing = false;
        self.cold_c = COLD_SET_POINT;
        self.hot_c = HOT_SET_POINT;
        self.mixture_c = ROOM_TEMPERATURE;
    }

    /// Mass-weighted final temperature, °C.
    pub fn equilibrium_c(&self) -> f64 {
        let (mc, mh) = (self.cold.mass_kg(), self.hot.mass_kg());
        if mc + mh <= 0.0 {
            return ROOM_TEMPERATURE;
        }
        (mc * COLD_SET_POINT + mh * HOT_SET_POINT) / (mc + mh)
    }

    /// Advance one step and return the three probe values.
    pub fn next_values(&mut self) -> [UnitValues; 3] {
        if self.mixing {
            let target = self.equilibrium_c();
            self.mixture_c += (target - self.mixture_c) * MIXING_RELAXATION;
        }
        let cold = self.cold_c + self.jitter();
        let hot = self.hot_c + self.jitter();
        let mixture = self.mixture_c + self.jitter();
        [
            UnitValues::from_celsius(cold),
            UnitValues::from_celsius(hot),
            UnitValues::from_celsius(mixture),
        ]
    }

    /// Advance one step and encode it as a wire payload.
    pub fn next_payload(&mut self) -> Vec<u8> {
        let values = self.next_values();
        let mut root = Map::new();
        for (probe, v) in Probe::ALL.into_iter().zip(values) {
            let mut record = Map::new();
            for unit in Unit::ALL {
                record.insert(unit.wire_key().to_string(), Value::from(v.get(unit)));
            }
            root.insert(probe.wire_key().to_string(), Value::Object(record));
        }
        Value::Object(root).to_string().into_bytes()
    }

    fn jitter(&mut self) -> f64 {
        if self.noise == 0.0 {
            0.0
        } else {
            self.rng.gen_range(-self.noise..=self.noise)
        }
    }
}
