// src/models/mod.rs

//! Domain models for race result collection.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod race;
mod roster;

// Re-export all public types
pub use config::{Config, HttpConfig, ReportConfig, SourcesConfig};
pub use race::{
    Attribution, Candidate, DateRange, MatchMode, MatchedLine, RaceCard, RaceDocument,
    ResultsBlock,
};
pub use roster::{Roster, RosterEntry};
