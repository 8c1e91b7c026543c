//! Pipeline entry points.
//!
//! - `run_source`: Collect one source's matching results into a report
//! - `run_combined`: Run several sources and merge them in priority order

pub mod combined;
pub mod run;

pub use combined::{CombinedSource, run_combined};
pub use run::{RunOutcome, RunSettings, run_source};
