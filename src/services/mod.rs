//! Service layer for race result collection.
//!
//! This module contains the business logic for:
//! - Roster matching (`match_lines`)
//! - Race card rendering (`render`, `parse_cards`)
//! - Output document aggregation (`Report`)

pub mod matcher;
pub mod render;
pub mod report;

pub use matcher::match_lines;
pub use render::{parse_cards, render};
pub use report::Report;
