//! Background Tasks Module
//!
//! Tasks that drive a cache store from the async runtime.
//!
//! # Tasks
//! - Stats Reporter: Logs a statistics snapshot at configured intervals
//! - Soak Run: Hammers a store from concurrent workers and audits cleanup

mod report;
mod soak;

pub use report::spawn_stats_reporter;
pub use soak::{run_soak, SoakReport};
