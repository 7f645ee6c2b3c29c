// Diagnostics — per-bridge delivery counters.

pub mod stats;
