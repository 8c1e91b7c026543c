// src/lib.rs

//! Race results collection library
//!
//! Scrapes timing company websites for races in a date window, keeps the
//! result rows belonging to a roster of club members and writes them into
//! a single HTML report.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod sources;
pub mod utils;
