//! Reading validation.
//!
//! The probe rig publishes one JSON document per sample:
//!
//! ```json
//! {
//!   "dingin":   {"C": 10.1, "F": 50.18, "K": 283.25, "R": 8.08},
//!   "panas":    {"C": 79.8, "F": 175.64, "K": 352.95, "R": 63.84},
//!   "campuran": {"C": 31.2, "F": 88.16, "K": 304.35, "R": 24.96}
//! }
//! ```
//!
//! `dingin`, `panas` and `campuran` are the cold, hot and mixture probes. The English
//! names are accepted as aliases. Every probe must carry all four unit keys with
//! numeric values; anything else is a [`CalorError::MalformedPayload`].

use crate::error::{AppResult, CalorError};
use crate::units::{Unit, UnitValues};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tolerance used when comparing reported F/K/R against the Celsius-derived value.
const CONSISTENCY_TOLERANCE: f64 = 0.05;

/// One of the three thermal probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Probe {
    /// Cold water probe
    Cold,
    /// Hot water probe
    Hot,
    /// Mixture probe
    Mixture,
}

impl Probe {
    /// Probes in wire/column order.
    pub const ALL: [Probe; 3] = [Probe::Cold, Probe::Hot, Probe::Mixture];

    /// Key used by the deployed rig.
    pub fn wire_key(self) -> &'static str {
        match self {
            Probe::Cold => "dingin",
            Probe::Hot => "panas",
            Probe::Mixture => "campuran",
        }
    }

    /// English alias accepted on input.
    pub fn alias(self) -> &'static str {
        match self {
            Probe::Cold => "cold",
            Probe::Hot => "hot",
            Probe::Mixture => "mixture",
        }
    }

    /// Column label prefix used in persisted rows.
    pub fn column_prefix(self) -> &'static str {
        match self {
            Probe::Cold => "Dingin",
            Probe::Hot => "Panas",
            Probe::Mixture => "Campuran",
        }
    }
}

impl std::fmt::Display for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.alias())
    }
}

/// A validated inbound reading, values as reported by the rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Capture instant (ingestion wall clock)
    pub timestamp: DateTime<Utc>,
    /// Cold probe as reported
    pub cold: UnitValues,
    /// Hot probe as reported
    pub hot: UnitValues,
    /// Mixture probe as reported
    pub mixture: UnitValues,
}

impl Reading {
    /// Reported values for one probe.
    pub fn probe(&self, probe: Probe) -> &UnitValues {
        match probe {
            Probe::Cold => &self.cold,
            Probe::Hot => &self.hot,
            Probe::Mixture => &self.mixture,
        }
    }
}

/// Parse and validate a three-probe payload.
pub fn validate(payload: &[u8], timestamp: DateTime<Utc>) -> AppResult<Reading> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| CalorError::MalformedPayload(format!("not valid JSON: {e}")))?;
    validate_value(&value, timestamp)
}

/// Validate an already-decoded three-probe payload.
pub fn validate_value(value: &Value, timestamp: DateTime<Utc>) -> AppResult<Reading> {
    let root = value
        .as_object()
        .ok_or_else(|| CalorError::MalformedPayload("payload is not an object".into()))?;

    let missing: Vec<&str> = Probe::ALL
        .iter()
        .filter(|probe| probe_entry(root, **probe).is_none())
        .map(|probe| probe.wire_key())
        .collect();
    if !missing.is_empty() {
        return Err(CalorError::MalformedPayload(format!(
            "missing probe key(s): {}",
            missing.join(", ")
        )));
    }

    let mut parsed = [UnitValues::from_celsius(0.0); 3];
    for (slot, probe) in parsed.iter_mut().zip(Probe::ALL) {
        let entry = probe_entry(root, probe).unwrap_or(&Value::Null);
        *slot = parse_probe(entry).map_err(|e| match e {
            CalorError::MalformedPayload(msg) => {
                CalorError::MalformedPayload(format!("{}: {msg}", probe.wire_key()))
            }
            other => other,
        })?;
    }
    let [cold, hot, mixture] = parsed;

    Ok(Reading {
        timestamp,
        cold,
        hot,
        mixture,
    })
}

/// A payload in either supported layout.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Nested three-probe document
    Probes(Reading),
    /// Flat single-probe record `{C, F, K, R}`
    Single(UnitValues),
}

/// Parse a payload in whichever layout it uses.
///
/// A top-level object naming any probe (wire key or alias) is held to the
/// three-probe rules; anything else must be a flat single-probe record.
pub fn classify(payload: &[u8], timestamp: DateTime<Utc>) -> AppResult<Payload> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| CalorError::MalformedPayload(format!("not valid JSON: {e}")))?;
    let nested = value.as_object().is_some_and(|root| {
        Probe::ALL
            .iter()
            .any(|probe| probe_entry(root, *probe).is_some())
    });
    if nested {
        validate_value(&value, timestamp).map(Payload::Probes)
    } else {
        parse_probe(&value).map(Payload::Single)
    }
}

fn probe_entry(root: &Map<String, Value>, probe: Probe) -> Option<&Value> {
    root.get(probe.wire_key()).or_else(|| root.get(probe.alias()))
}

fn parse_probe(value: &Value) -> AppResult<UnitValues> {
    let map = value
        .as_object()
        .ok_or_else(|| CalorError::MalformedPayload("probe record is not an object".into()))?;

    let missing: Vec<&str> = Unit::ALL
        .iter()
        .map(|unit| unit.wire_key())
        .filter(|key| !map.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(CalorError::MalformedPayload(format!(
            "missing unit key(s): {}",
            missing.join(", ")
        )));
    }

    let mut values = [0.0_f64; 4];
    for (slot, unit) in values.iter_mut().zip(Unit::ALL) {
        *slot = map
            .get(unit.wire_key())
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                CalorError::MalformedPayload(format!("unit {} is not numeric", unit.wire_key()))
            })?;
    }
    let [c, f, k, r] = values;
    let reported = UnitValues { c, f, k, r };

    let derived = UnitValues::from_celsius(c);
    for unit in [Unit::Fahrenheit, Unit::Kelvin, Unit::Reaumur] {
        let delta = (reported.get(unit) - derived.get(unit)).abs();
        if delta > CONSISTENCY_TOLERANCE {
            tracing::debug!(
                unit = unit.wire_key(),
                reported = reported.get(unit),
                derived = derived.get(unit),
                "Reported value disagrees with Celsius-derived value"
            );
        }
    }

    Ok(reported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn probe(c: f64) -> Value {
        let v = UnitValues::from_celsius(c);
        json!({"C": v.c, "F": v.f, "K": v.k, "R": v.r})
    }

    #[test]
    fn accepts_wire_keys() {
        let payload = json!({"dingin": probe(10.0), "panas": probe(80.0), "campuran": probe(30.0)});
        let reading = validate_value(&payload, Utc::now()).unwrap();
        assert_eq!(reading.cold.c, 10.0);
        assert_eq!(reading.hot.c, 80.0);
        assert_eq!(reading.probe(Probe::Mixture).c, 30.0);
    }

    #[test]
    fn accepts_english_aliases() {
        let payload = json!({"cold": probe(5.0), "hot": probe(70.0), "mixture": probe(25.0)});
        let reading = validate_value(&payload, Utc::now()).unwrap();
        assert_eq!(reading.cold.c, 5.0);
    }

    #[test]
    fn rejects_missing_probe() {
        let payload = json!({"dingin": probe(10.0), "panas": probe(80.0)});
        let err = validate_value(&payload, Utc::now()).unwrap_err();
        assert!(matches!(err, CalorError::MalformedPayload(ref m) if m.contains("campuran")));
    }

    #[test]
    fn rejects_missing_unit() {
        let payload = json!({
            "dingin": probe(10.0),
            "panas": {"C": 80.0, "F": 176.0, "K": 353.15},
            "campuran": probe(30.0),
        });
        let err = validate_value(&payload, Utc::now()).unwrap_err();
        assert!(matches!(err, CalorError::MalformedPayload(ref m) if m.contains("panas") && m.contains('R')));
    }

    #[test]
    fn rejects_non_numeric_unit() {
        let payload = json!({
            "dingin": {"C": "cold", "F": 50.0, "K": 283.15, "R": 8.0},
            "panas": probe(80.0),
            "campuran": probe(30.0),
        });
        assert!(matches!(
            validate_value(&payload, Utc::now()),
            Err(CalorError::MalformedPayload(_))
        ));
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(matches!(
            validate(b"not json", Utc::now()),
            Err(CalorError::MalformedPayload(_))
        ));
        assert!(matches!(
            validate(b"[1,2,3]", Utc::now()),
            Err(CalorError::MalformedPayload(_))
        ));
    }

    #[test]
    fn flat_layout() {
        let flat = classify(br#"{"C": 20.0, "F": 68.0, "K": 293.15, "R": 16.0}"#, Utc::now());
        let Ok(Payload::Single(values)) = flat else {
            panic!("expected a single-probe record, got {flat:?}");
        };
        assert_eq!(values.c, 20.0);
        assert!(classify(br#"{"C": 20.0}"#, Utc::now()).is_err());
    }
}
