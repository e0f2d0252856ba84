//! Shared helpers for RecordVault benchmarks.

pub mod utils;
