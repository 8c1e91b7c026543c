// src/sources/mod.rs

//! Race result sources.
//!
//! Every result-publishing site is handled by one `RaceSource`:
//! - `discover` reads the site's listing for the date window and yields candidates
//! - `fetch` downloads one candidate's result document
//! - `extract_results` locates the results block inside that document
//!
//! Listing failures are returned from `discover` and abort that source's run.
//! Anything that goes wrong for a single candidate is reported per item so the
//! pipeline can skip it and continue.

mod active;
mod bestrace;
mod compuscore;
mod coolrunning;
mod lmsports;
mod nyrr;

use std::fmt;

use reqwest::blocking::Client;

pub use active::Active;
pub use bestrace::BestRace;
pub use compuscore::Compuscore;
pub use coolrunning::CoolRunning;
pub use lmsports::LmSports;
pub use nyrr::NewYorkRR;

use crate::error::Result;
use crate::models::{Candidate, Config, DateRange, RaceDocument, ResultsBlock};

/// Lazily produced candidates; `Err` items are per-candidate failures.
pub type Candidates<'a> = Box<dyn Iterator<Item = Result<Candidate>> + 'a>;

/// Capability set shared by every result site.
pub trait RaceSource {
    /// Site name used in attributions and logs.
    fn label(&self) -> &str;

    /// Find candidate races in the date window, restricted to `regions` where
    /// the site supports it.
    fn discover<'a>(&'a self, range: &DateRange, regions: &[String]) -> Result<Candidates<'a>>;

    /// Download a candidate's result document.
    fn fetch(&self, candidate: &Candidate) -> Result<RaceDocument>;

    /// Locate the results block inside a fetched document.
    fn extract_results(&self, doc: &RaceDocument) -> Result<ResultsBlock>;

    /// Secondary result pages announced by a fetched document.
    fn follow_ups(&self, _doc: &RaceDocument) -> Vec<Candidate> {
        Vec::new()
    }
}

/// Supported result sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Compuscore,
    BestRace,
    CoolRunning,
    Active,
    LmSports,
    NewYorkRR,
}

impl SourceKind {
    /// Sources run by combined mode, in merge priority order.
    pub const COMBINED: [SourceKind; 4] = [
        SourceKind::Compuscore,
        SourceKind::BestRace,
        SourceKind::Active,
        SourceKind::NewYorkRR,
    ];

    /// Whether results are filtered by the roster (NYRR filters by team on the site).
    pub fn uses_roster(&self) -> bool {
        !matches!(self, SourceKind::NewYorkRR)
    }

    /// Default regions from configuration.
    pub fn default_regions(&self, config: &Config, combined: bool) -> Vec<String> {
        match self {
            SourceKind::Active if combined => config.sources.combined_states.clone(),
            SourceKind::Active => config.sources.active_states.clone(),
            SourceKind::CoolRunning => config.sources.coolrunning_states.clone(),
            _ => Vec::new(),
        }
    }

    /// Build the source for this kind.
    pub fn build(&self, client: Client, config: &Config) -> Box<dyn RaceSource> {
        match self {
            SourceKind::Compuscore => Box::new(Compuscore::new(client)),
            SourceKind::BestRace => Box::new(BestRace::new(client)),
            SourceKind::CoolRunning => Box::new(CoolRunning::new(client)),
            SourceKind::Active => Box::new(Active::new(client)),
            SourceKind::LmSports => Box::new(LmSports::new(client)),
            SourceKind::NewYorkRR => Box::new(NewYorkRR::new(client, &config.sources.nyrr_team)),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Compuscore => "Compuscore",
            SourceKind::BestRace => "BestRace",
            SourceKind::CoolRunning => "CoolRunning",
            SourceKind::Active => "Active",
            SourceKind::LmSports => "L&M Sports",
            SourceKind::NewYorkRR => "NYRR",
        };
        f.write_str(name)
    }
}

/// Remove repeated URLs, keeping the first occurrence.
fn dedup_by_url(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = std::collections::HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_priority_order() {
        assert_eq!(SourceKind::COMBINED[0], SourceKind::Compuscore);
        assert_eq!(SourceKind::COMBINED[3], SourceKind::NewYorkRR);
        assert!(!SourceKind::COMBINED.contains(&SourceKind::CoolRunning));
    }

    #[test]
    fn test_default_regions() {
        let config = Config::default();
        assert_eq!(SourceKind::Active.default_regions(&config, false), vec!["NJ"]);
        assert_eq!(SourceKind::Active.default_regions(&config, true), vec!["NY", "NJ", "PA"]);
        assert!(SourceKind::Compuscore.default_regions(&config, false).is_empty());
    }

    #[test]
    fn test_dedup_by_url() {
        let c = |url: &str| Candidate::new(url, url, url);
        let out = dedup_by_url(vec![c("a"), c("b"), c("a")]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].url, "b");
    }
}
