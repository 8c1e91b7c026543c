//! End-to-end runs against an in-memory source.

use std::collections::HashMap;
use std::fs;

use raceresults::error::{AppError, Result};
use raceresults::models::{
    Candidate, DateRange, MatchMode, RaceDocument, ResultsBlock, Roster,
};
use raceresults::pipeline::{CombinedSource, RunSettings, run_combined, run_source};
use raceresults::services::{Report, parse_cards};
use raceresults::sources::{Candidates, RaceSource};
use tempfile::TempDir;

/// Documents are plain text: race name, race date, then result lines.
/// A document reading `BROKEN` has no results block.
struct FakeSource {
    label: &'static str,
    listing: Option<Vec<Option<Candidate>>>,
    documents: HashMap<String, String>,
    follow_ups: HashMap<String, Vec<Candidate>>,
}

impl FakeSource {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            listing: Some(Vec::new()),
            documents: HashMap::new(),
            follow_ups: HashMap::new(),
        }
    }

    fn race(mut self, url: &str, name: &str, lines: &[&str]) -> Self {
        let mut doc = format!("{name}\nMarch 7, 2015");
        for line in lines {
            doc.push('\n');
            doc.push_str(line);
        }
        self.documents.insert(url.to_string(), doc);
        self.listed(url)
    }

    fn listed(mut self, url: &str) -> Self {
        if let Some(listing) = self.listing.as_mut() {
            listing.push(Some(candidate(url)));
        }
        self
    }

    /// A page without a date line; the listing supplies the date.
    fn undated(mut self, url: &str, name: &str, date: chrono::NaiveDate, lines: &[&str]) -> Self {
        let mut doc = format!("{name}\n");
        for line in lines {
            doc.push('\n');
            doc.push_str(line);
        }
        self.documents.insert(url.to_string(), doc);
        if let Some(listing) = self.listing.as_mut() {
            listing.push(Some(candidate(url).with_date(date)));
        }
        self
    }

    fn broken(mut self, url: &str) -> Self {
        self.documents.insert(url.to_string(), "BROKEN".to_string());
        self.listed(url)
    }

    fn bad_entry(mut self) -> Self {
        if let Some(listing) = self.listing.as_mut() {
            listing.push(None);
        }
        self
    }

    fn unreachable(mut self) -> Self {
        self.listing = None;
        self
    }
}

fn candidate(url: &str) -> Candidate {
    Candidate::new(url, url, url)
}

impl RaceSource for FakeSource {
    fn label(&self) -> &str {
        self.label
    }

    fn discover<'a>(&'a self, _range: &DateRange, _regions: &[String]) -> Result<Candidates<'a>> {
        let listing = self
            .listing
            .as_ref()
            .ok_or_else(|| AppError::fetch("http://listing.example.com", "HTTP status 503"))?;
        Ok(Box::new(listing.iter().map(|entry| {
            entry
                .clone()
                .ok_or_else(|| AppError::parse("listing", "entry without a result file"))
        })))
    }

    fn fetch(&self, candidate: &Candidate) -> Result<RaceDocument> {
        self.documents
            .get(&candidate.url)
            .map(|doc| RaceDocument::new(&candidate.url, doc.clone()))
            .ok_or_else(|| AppError::fetch(&candidate.url, "HTTP status 404"))
    }

    fn extract_results(&self, doc: &RaceDocument) -> Result<ResultsBlock> {
        if doc.primary() == "BROKEN" {
            return Err(AppError::parse(&doc.url, "no <pre> element found"));
        }
        let mut lines = doc.primary().lines().map(str::to_string);
        Ok(ResultsBlock {
            race_name: lines.next().unwrap_or_default(),
            race_date: lines.next().filter(|d| !d.is_empty()),
            banner: Some("Place Name           City       Age S".to_string()),
            lines: lines.collect(),
            mode: MatchMode::Placement,
        })
    }

    fn follow_ups(&self, doc: &RaceDocument) -> Vec<Candidate> {
        self.follow_ups.get(&doc.url).cloned().unwrap_or_default()
    }
}

fn range() -> DateRange {
    let day = chrono::NaiveDate::from_ymd_opt(2015, 3, 7).unwrap();
    DateRange::single(day)
}

fn settings() -> RunSettings {
    RunSettings::new(range(), Vec::new())
}

fn report(dir: &TempDir) -> Report {
    Report::new(dir.path().join("results.html"), "rr.css")
}

#[test]
fn test_member_line_reaches_report() {
    let dir = TempDir::new().unwrap();
    let report = report(&dir);
    let roster = Roster::from_names([("Dan", "Vassallo")]).unwrap();
    let source = FakeSource::new("Compuscore").race(
        "http://results.example.com/boston.htm",
        "Boston Prep 16 Miler",
        &[
            "1.Kim Quick        Boston,MA 25 M",
            "8.Dan Vassallo   Boston,MA 34 M",
            "9.Dan Vassallone   Quincy,MA 30 M",
        ],
    );

    let outcome = run_source(&source, &roster, &settings(), &report).unwrap();
    assert_eq!(outcome.cards, 1);

    let html = fs::read_to_string(report.path()).unwrap();
    assert!(html.contains("8.Dan Vassallo   Boston,MA 34 M"));
    assert!(!html.contains("Vassallone"));

    let cards = parse_cards(&html);
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].race_name, "Boston Prep 16 Miler");
    assert_eq!(cards[0].lines, vec!["8.Dan Vassallo   Boston,MA 34 M"]);
    let source = cards[0].source.as_ref().unwrap();
    assert_eq!(source.label, "Compuscore");
    assert_eq!(source.url, "http://results.example.com/boston.htm");
}

#[test]
fn test_rank_and_spacing_preserved() {
    let dir = TempDir::new().unwrap();
    let report = report(&dir);
    let roster = Roster::from_names([("Jeff", "Pellis")]).unwrap();
    let source = FakeSource::new("Compuscore").race(
        "http://results.example.com/hangover.htm",
        "Hangover 5K",
        &["2.Jeff Pellis           Hillsborough,NJ  41 M\r"],
    );

    run_source(&source, &roster, &settings(), &report).unwrap();

    let html = fs::read_to_string(report.path()).unwrap();
    assert!(html.contains("2.Jeff Pellis           Hillsborough,NJ  41 M"));
    assert!(!html.contains('\r'));
}

#[test]
fn test_no_matches_leaves_empty_shell() {
    let dir = TempDir::new().unwrap();
    let report = report(&dir);
    let roster = Roster::from_names([("Nobody", "Here")]).unwrap();
    let source = FakeSource::new("BestRace").race(
        "http://results.example.com/frosty.htm",
        "Frosty 5K",
        &["1.Kim Quick  Summit,NJ 25 M"],
    );

    let outcome = run_source(&source, &roster, &settings(), &report).unwrap();
    assert_eq!(outcome.fetched, 1);
    assert_eq!(outcome.cards, 0);

    let html = fs::read_to_string(report.path()).unwrap();
    assert!(html.starts_with("<html>"));
    assert!(html.contains("<link rel=\"stylesheet\" href=\"rr.css\""));
    assert!(html.trim_end().ends_with("</html>"));
    assert!(parse_cards(&html).is_empty());
}

#[test]
fn test_empty_listing_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let report = report(&dir);
    let roster = Roster::from_names([("Dan", "Vassallo")]).unwrap();

    let outcome = run_source(&FakeSource::new("BestRace"), &roster, &settings(), &report).unwrap();
    assert_eq!(outcome.candidates, 0);
    assert!(report.path().exists());
}

#[test]
fn test_bad_candidates_are_skipped() {
    let dir = TempDir::new().unwrap();
    let report = report(&dir);
    let roster = Roster::from_names([("Jeff", "Pellis")]).unwrap();
    let source = FakeSource::new("Compuscore")
        .listed("http://results.example.com/missing.htm")
        .broken("http://results.example.com/broken.htm")
        .bad_entry()
        .race(
            "http://results.example.com/good.htm",
            "Good Race",
            &["2.Jeff Pellis  Hillsborough,NJ 41 M"],
        );

    let outcome = run_source(&source, &roster, &settings(), &report).unwrap();
    assert_eq!(outcome.candidates, 4);
    assert_eq!(outcome.failed, 3);
    assert_eq!(outcome.cards, 1);
    assert_eq!(report.cards().unwrap().len(), 1);
}

#[test]
fn test_listing_failure_aborts_source() {
    let dir = TempDir::new().unwrap();
    let report = report(&dir);
    let roster = Roster::from_names([("Jeff", "Pellis")]).unwrap();
    let source = FakeSource::new("Compuscore").unreachable();

    let err = run_source(&source, &roster, &settings(), &report).unwrap_err();
    assert!(matches!(err, AppError::Fetch { .. }));
}

#[test]
fn test_follow_ups_run_after_parent_once() {
    let dir = TempDir::new().unwrap();
    let report = report(&dir);
    let roster = Roster::from_names([("Jeff", "Pellis"), ("Dan", "Vassallo")]).unwrap();
    let set1 = "http://results.example.com/Mar7_Race_set1.shtml";
    let set2 = "http://results.example.com/Mar7_Race_set2.shtml";

    let mut source = FakeSource::new("CoolRunning")
        .race(set1, "Race set 1", &["2.Jeff Pellis  Hillsborough,NJ 41 M"])
        .race("http://results.example.com/other.htm", "Other Race", &["5.Dan Vassallo  Boston,MA 34 M"])
        .race(set2, "Race set 2", &["108.Dan Vassallo  Boston,MA 34 M"]);
    source.follow_ups.insert(set1.to_string(), vec![candidate(set2)]);

    let outcome = run_source(&source, &roster, &settings(), &report).unwrap();
    assert_eq!(outcome.fetched, 3);

    let names: Vec<String> = parse_cards(&fs::read_to_string(report.path()).unwrap())
        .into_iter()
        .map(|c| c.race_name)
        .collect();
    assert_eq!(names, vec!["Race set 1", "Race set 2", "Other Race"]);
}

#[test]
fn test_listing_date_fills_missing_heading() {
    let dir = TempDir::new().unwrap();
    let report = report(&dir);
    let roster = Roster::from_names([("Jeff", "Pellis")]).unwrap();
    let day = chrono::NaiveDate::from_ymd_opt(2015, 3, 7).unwrap();
    let source = FakeSource::new("L&M Sports").undated(
        "http://results.example.com/shamrock15.htm",
        "Shamrock 5K",
        day,
        &["  2 Jeff Pellis        41 Hillsborough NJ  17:40"],
    );

    run_source(&source, &roster, &settings(), &report).unwrap();

    let cards = parse_cards(&fs::read_to_string(report.path()).unwrap());
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].race_name, "Shamrock 5K");
    assert_eq!(cards[0].race_date.as_deref(), Some("March 7, 2015"));
}

#[test]
fn test_rerun_appends_to_existing_report() {
    let dir = TempDir::new().unwrap();
    let report = report(&dir);
    let roster = Roster::from_names([("Jeff", "Pellis")]).unwrap();
    let source = FakeSource::new("Compuscore").race(
        "http://results.example.com/hangover.htm",
        "Hangover 5K",
        &["2.Jeff Pellis  Hillsborough,NJ 41 M"],
    );

    run_source(&source, &roster, &settings(), &report).unwrap();
    run_source(&source, &roster, &settings(), &report).unwrap();

    assert_eq!(report.cards().unwrap().len(), 2);
}

#[test]
fn test_combined_merges_in_source_order() {
    let dir = TempDir::new().unwrap();
    let report = report(&dir);
    let roster = Roster::from_names([("Jeff", "Pellis")]).unwrap();
    let line = "2.Jeff Pellis  Hillsborough,NJ 41 M";

    let sources = vec![
        CombinedSource::new(
            Box::new(
                FakeSource::new("Compuscore")
                    .race("http://a.example.com/1", "Alpha 5K", &[line])
                    .race("http://a.example.com/2", "Alpha 10K", &[line]),
            ),
            Vec::new(),
        ),
        CombinedSource::new(Box::new(FakeSource::new("BestRace").unreachable()), Vec::new()),
        CombinedSource::new(
            Box::new(FakeSource::new("Active.com").race("http://c.example.com/1", "Gamma Half", &[line])),
            vec!["NJ".to_string()],
        ),
    ];

    let outcome = run_combined(&sources, &roster, range(), &report).unwrap();
    assert_eq!(outcome.cards, 3);

    let cards = parse_cards(&fs::read_to_string(report.path()).unwrap());
    let names: Vec<&str> = cards.iter().map(|c| c.race_name.as_str()).collect();
    assert_eq!(names, vec!["Alpha 5K", "Alpha 10K", "Gamma Half"]);
    let labels: Vec<&str> = cards
        .iter()
        .map(|c| c.source.as_ref().unwrap().label.as_str())
        .collect();
    assert_eq!(labels, vec!["Compuscore", "Compuscore", "Active.com"]);
}
