//! Experiment mode, lock sub-state and per-reading substitution.
pub mod state;
pub mod substitute;

pub use state::{Control, ExperimentPhase, LockCapture, LockState, LockStatus, ModeState};
pub use substitute::{substitute, EffectiveReading};
