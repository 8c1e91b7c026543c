// src/pipeline/run.rs

//! Single-source run: discover, fetch, extract, match, render, append.

use std::collections::{HashSet, VecDeque};
use std::ops::AddAssign;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{Attribution, Candidate, DateRange, RaceCard, Roster};
use crate::services::{Report, match_lines, render};
use crate::sources::RaceSource;
use crate::utils::log;

/// What a run searches for.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub range: DateRange,
    /// Region codes for sources that filter by region
    pub regions: Vec<String>,
}

impl RunSettings {
    pub fn new(range: DateRange, regions: Vec<String>) -> Self {
        Self { range, regions }
    }
}

/// Counters for one source run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// Candidates yielded by discovery, follow-ups included
    pub candidates: usize,
    /// Documents fetched successfully
    pub fetched: usize,
    /// Cards appended to the report
    pub cards: usize,
    /// Candidates deliberately skipped (unsupported layouts)
    pub skipped: usize,
    /// Candidates dropped after a fetch or parse failure
    pub failed: usize,
}

impl AddAssign for RunOutcome {
    fn add_assign(&mut self, other: Self) {
        self.candidates += other.candidates;
        self.fetched += other.fetched;
        self.cards += other.cards;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Run one source into `report`.
///
/// A listing failure aborts the run. Failures confined to one candidate are
/// logged and counted, and the run continues.
pub fn run_source(
    source: &dyn RaceSource,
    roster: &Roster,
    settings: &RunSettings,
    report: &Report,
) -> Result<RunOutcome> {
    let start_time = Utc::now();
    log::header(&format!("{} results", source.label()));
    report.initialize()?;

    let mut outcome = RunOutcome::default();
    let mut visited = HashSet::new();

    for item in source.discover(&settings.range, &settings.regions)? {
        outcome.candidates += 1;
        let candidate = match item {
            Ok(candidate) => candidate,
            Err(e) => {
                record_failure(&mut outcome, "listing entry", e)?;
                continue;
            }
        };

        // Follow-ups are processed right after their parent.
        let mut queue = VecDeque::from([candidate]);
        while let Some(candidate) = queue.pop_front() {
            if !visited.insert(candidate.url.clone()) {
                ::log::debug!("Already processed {}", candidate.url);
                continue;
            }
            match process_candidate(source, roster, report, &candidate, &mut outcome) {
                Ok(follow_ups) => {
                    outcome.candidates += follow_ups.len();
                    queue.extend(follow_ups);
                }
                Err(e) => record_failure(&mut outcome, &candidate.name, e)?,
            }
        }
    }

    let elapsed = Utc::now() - start_time;
    log::summary(
        &format!("{} complete", source.label()),
        &[
            ("Candidates", outcome.candidates.to_string()),
            ("Fetched", outcome.fetched.to_string()),
            ("Cards written", outcome.cards.to_string()),
            ("Skipped", outcome.skipped.to_string()),
            ("Failed", outcome.failed.to_string()),
            ("Elapsed", format!("{}s", elapsed.num_seconds())),
        ],
    );
    Ok(outcome)
}

/// Fetch, extract, match and render one candidate.
///
/// Returns the follow-up pages the document announced.
fn process_candidate(
    source: &dyn RaceSource,
    roster: &Roster,
    report: &Report,
    candidate: &Candidate,
    outcome: &mut RunOutcome,
) -> Result<Vec<Candidate>> {
    log::sub_item(&format!("{} ({})", candidate.name, candidate.url));
    let doc = source.fetch(candidate)?;
    outcome.fetched += 1;

    let follow_ups = source.follow_ups(&doc);
    let mut block = source.extract_results(&doc)?;
    if block.race_date.is_none() {
        block.race_date = candidate.date.map(|d| d.format("%B %-d, %Y").to_string());
    }
    let matched = match_lines(&block.lines, roster, block.mode);
    if matched.is_empty() {
        ::log::debug!("No matches in {}", block.race_name);
        return Ok(follow_ups);
    }

    ::log::info!("{} matched {} lines", block.race_name, matched.len());
    let attribution = Attribution {
        label: source.label().to_string(),
        url: doc.url.clone(),
    };
    let card = RaceCard::from_block(&block, &matched, attribution);
    report.append(&render(&card))?;
    outcome.cards += 1;
    Ok(follow_ups)
}

/// Count and log a per-candidate failure, or propagate a fatal one.
fn record_failure(outcome: &mut RunOutcome, context: &str, error: AppError) -> Result<()> {
    match error {
        AppError::Unsupported { .. } => {
            ::log::info!("Skipping {}: {}", context, error);
            outcome.skipped += 1;
            Ok(())
        }
        e if e.is_recoverable() => {
            ::log::warn!("Skipping {}: {}", context, e);
            outcome.failed += 1;
            Ok(())
        }
        e => Err(e),
    }
}
