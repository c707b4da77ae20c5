//! Bounded history properties exercised through the public core API.

use calor_daq::calorimetry::Calculator;
use calor_daq::core::Calorimeter;
use calor_daq::data::buffer::{BufferStore, Latest};
use calor_daq::experiment::ModeState;
use calor_daq::reading::Reading;
use calor_daq::units::{Unit, UnitValues};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn t(i: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(i)
}

fn reading(i: i64) -> Reading {
    let base = i as f64;
    Reading {
        timestamp: t(i),
        cold: UnitValues::from_celsius(10.0 + base * 0.01),
        hot: UnitValues::from_celsius(80.0 - base * 0.01),
        mixture: UnitValues::from_celsius(25.0 + base * 0.1),
    }
}

fn calorimeter(capacity: usize) -> Calorimeter {
    Calorimeter::new(
        BufferStore::new(capacity),
        ModeState::default(),
        Calculator::default(),
    )
}

#[test]
fn test_capacity_keeps_newest_entries() {
    let capacity = 100;
    for extra in [0_i64, 1, 37, 250] {
        let mut cal = calorimeter(capacity);
        let total = capacity as i64 + extra;
        let mut evictions = 0;
        for i in 0..total {
            if cal.ingest(&reading(i)).evicted {
                evictions += 1;
            }
        }

        let snap = cal.snapshot();
        assert_eq!(snap.len(), capacity);
        assert_eq!(evictions, extra);
        assert_eq!(snap.series.timestamps.first(), Some(&t(extra)));
        assert_eq!(snap.series.timestamps.last(), Some(&t(total - 1)));
    }
}

#[test]
fn test_series_stay_aligned_and_ordered() {
    let mut cal = calorimeter(16);
    for i in 0..40 {
        cal.ingest(&reading(i));
        let snap = cal.snapshot();
        assert!(snap.series.is_aligned());
        assert!(snap.len() <= 16);
        assert!(snap
            .series
            .timestamps
            .windows(2)
            .all(|w| w[0] <= w[1]));
    }
}

#[test]
fn test_units_derived_from_celsius() {
    let mut cal = calorimeter(10);
    // Reported F/K/R deliberately inconsistent; stored values must not be.
    let mut odd = reading(0);
    odd.cold.f = 0.0;
    odd.hot.k = 1.0;
    odd.mixture.r = -5.0;
    cal.ingest(&odd);
    cal.ingest(&reading(1));

    let snap = cal.snapshot();
    for series in [&snap.series.cold, &snap.series.hot, &snap.series.mixture] {
        for v in series {
            let derived = UnitValues::from_celsius(v.c);
            for unit in Unit::ALL {
                assert!((v.get(unit) - derived.get(unit)).abs() < 1e-9);
            }
        }
    }
}

#[test]
fn test_latest_requires_two_entries() {
    let mut cal = calorimeter(5);
    assert_eq!(cal.buffer().latest(), Latest::NotReady);
    cal.ingest(&reading(0));
    assert_eq!(cal.buffer().latest(), Latest::NotReady);
    cal.ingest(&reading(1));
    match cal.buffer().latest() {
        Latest::Ready(entry) => assert_eq!(entry.reading.timestamp, t(1)),
        Latest::NotReady => panic!("two entries should be ready"),
    }
}

#[test]
fn test_snapshot_is_detached_copy() {
    let mut cal = calorimeter(5);
    cal.ingest(&reading(0));
    let before = cal.snapshot();
    cal.ingest(&reading(1));
    assert_eq!(before.len(), 1);
    assert_eq!(cal.snapshot().len(), 2);
}
