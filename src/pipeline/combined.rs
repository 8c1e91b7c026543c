// src/pipeline/combined.rs

//! Combined run: several sources merged into one report.
//!
//! Each source writes its own partial document in a scratch directory. The
//! partials are merged into the output in source order once every source
//! has run.

use tempfile::TempDir;

use crate::error::Result;
use crate::models::{DateRange, Roster};
use crate::services::Report;
use crate::sources::RaceSource;
use crate::utils::log;

use super::run::{RunOutcome, RunSettings, run_source};

/// One source of a combined run with the regions it searches.
pub struct CombinedSource {
    pub source: Box<dyn RaceSource>,
    pub regions: Vec<String>,
}

impl CombinedSource {
    pub fn new(source: Box<dyn RaceSource>, regions: Vec<String>) -> Self {
        Self { source, regions }
    }
}

/// Run every source and merge their cards into `report` in the order given.
///
/// A source whose run fails is logged and contributes no cards; the rest
/// still run.
pub fn run_combined(
    sources: &[CombinedSource],
    roster: &Roster,
    range: DateRange,
    report: &Report,
) -> Result<RunOutcome> {
    let scratch = TempDir::new()?;
    let mut partials = Vec::with_capacity(sources.len());
    let mut total = RunOutcome::default();

    for (i, entry) in sources.iter().enumerate() {
        log::step(i + 1, sources.len(), entry.source.label());
        let path = scratch.path().join(format!("partial-{i}.html"));
        let partial = Report::new(&path, report.stylesheet());
        let settings = RunSettings::new(range, entry.regions.clone());

        match run_source(entry.source.as_ref(), roster, &settings, &partial) {
            Ok(outcome) => {
                total += outcome;
                partials.push(path);
            }
            Err(e) => {
                ::log::warn!("{} failed, its results are left out: {}", entry.source.label(), e);
            }
        }
    }

    let merged = report.merge(&partials)?;
    log::summary(
        "Combined run complete",
        &[
            ("Sources", sources.len().to_string()),
            ("Sources merged", partials.len().to_string()),
            ("Cards merged", merged.to_string()),
            ("Output", report.path().display().to_string()),
        ],
    );
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_add_assign() {
        let mut total = RunOutcome {
            candidates: 2,
            cards: 1,
            ..RunOutcome::default()
        };
        total += RunOutcome {
            candidates: 3,
            fetched: 3,
            failed: 1,
            ..RunOutcome::default()
        };
        assert_eq!(total.candidates, 5);
        assert_eq!(total.fetched, 3);
        assert_eq!(total.cards, 1);
        assert_eq!(total.failed, 1);
    }
}
