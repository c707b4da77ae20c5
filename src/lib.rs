//! # Calorimetry DAQ Core Library
//!
//! This crate is the acquisition core for a three-probe mixing calorimeter. It
//! ingests temperature readings (cold bath, hot bath, mixture) from a streaming
//! transport, keeps a bounded time-ordered history, drives a small experiment
//! state machine, and computes heat released and absorbed from the configured
//! vessel masses. A presentation layer polls consistent snapshots and issues
//! user commands concurrently with ingestion.
//!
//! ## Crate Structure
//!
//! - **`units`**: temperature scales and the four-unit value record.
//! - **`reading`**: the wire payload validator producing [`reading::Reading`].
//! - **`calorimetry`**: masses, vessels and the heat calculator.
//! - **`experiment`**: the measuring/mixing/finished phase machine, the lock
//!   sub-state and per-reading substitution of locked temperatures.
//! - **`data`**: the fixed-capacity history store and persistence sinks.
//! - **`core`**: [`core::Calorimeter`], which owns history, mode and lock as one
//!   unit.
//! - **`snapshot`**: immutable copies for display, with masking and the status
//!   line.
//! - **`messages`** / **`app_actor`**: the actor that serializes every access to
//!   the core, and its cloneable handle.
//! - **`transport`**: newline-delimited JSON ingestion.
//! - **`simulator`**: a mock rig emitting wire payloads.
//! - **`config`**: Figment-based configuration (TOML + environment).
//! - **`error`**: the [`error::CalorError`] taxonomy.
//! - **`tracing_init`**: structured logging setup.
//! - **`validation`**: small parameter checks shared by config and commands.

pub mod app_actor;
pub mod calorimetry;
pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod experiment;
pub mod messages;
pub mod reading;
pub mod simulator;
pub mod snapshot;
pub mod tracing_init;
pub mod transport;
pub mod units;
pub mod validation;
