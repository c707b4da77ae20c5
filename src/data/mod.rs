//! Bounded history and persistence.
pub mod buffer;
pub mod storage;
