//! Roster of tracked participants and their compiled match patterns.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use regex::{Regex, RegexBuilder};

use crate::error::{AppError, Result};

const FIRST_NAME_COLUMNS: [&str; 3] = ["fname", "first_name", "first"];
const LAST_NAME_COLUMNS: [&str; 3] = ["lname", "last_name", "last"];

/// One tracked participant.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub first_name: String,
    pub last_name: String,
    /// `^\s*<place><sep><first>\s+<last>\b`, case-insensitive
    placement: Regex,
    /// `<first> <last>`, `<last>, <first>` or `<last> <first>` anywhere, word bounded
    name: Regex,
}

impl RosterEntry {
    pub fn new(first_name: &str, last_name: &str) -> Result<Self> {
        let first = first_name.trim();
        let last = last_name.trim();
        if first.is_empty() || last.is_empty() {
            return Err(AppError::config("roster entry needs both a first and last name"));
        }

        let (f, l) = (name_pattern(first), name_pattern(last));
        let placement = format!(r"^\s*\d+(?:[.)]\s*|\s+){f}\s+{l}{}", boundary_after(last));
        let name = format!(
            r"(?:{}{f}\s+{l}{}|{}{l}(?:,\s*|\s+){f}{})",
            boundary_before(first),
            boundary_after(last),
            boundary_before(last),
            boundary_after(first),
        );

        Ok(Self {
            first_name: first.to_string(),
            last_name: last.to_string(),
            placement: compile(&placement)?,
            name: compile(&name)?,
        })
    }

    /// "First Last"
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Line leads with a placement followed by this member's name.
    pub fn matches_placement(&self, line: &str) -> bool {
        self.placement.is_match(line)
    }

    /// This member's name appears anywhere in the text.
    pub fn matches_name(&self, text: &str) -> bool {
        self.name.is_match(text)
    }

    fn key(&self) -> (String, String) {
        (self.first_name.to_lowercase(), self.last_name.to_lowercase())
    }
}

/// Escape a (possibly multi-word) name, allowing any whitespace between words.
fn name_pattern(name: &str) -> String {
    name.split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

fn boundary_before(name: &str) -> &'static str {
    match name.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' => r"\b",
        _ => "",
    }
}

fn boundary_after(name: &str) -> &'static str {
    match name.chars().last() {
        Some(c) if c.is_alphanumeric() || c == '_' => r"\b",
        _ => "",
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| AppError::config(format!("invalid roster pattern {pattern:?}: {e}")))
}

/// The set of tracked participants, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    index: HashMap<(String, String), usize>,
}

impl Roster {
    /// An empty roster (for sources that filter on the site side).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a roster from (first, last) pairs, collapsing duplicates.
    pub fn from_names<'a>(names: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut roster = Self::default();
        for (first, last) in names {
            roster.insert(RosterEntry::new(first, last)?);
        }
        Ok(roster)
    }

    /// Load a roster from a CSV file with first and last name columns.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            AppError::config(format!("cannot read roster {}: {e}", path.display()))
        })?;
        Self::from_reader(file)
    }

    /// Parse roster CSV from any reader.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv.headers()?.clone();
        let column = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        };
        let (Some(first_col), Some(last_col)) = (column(&FIRST_NAME_COLUMNS), column(&LAST_NAME_COLUMNS))
        else {
            return Err(AppError::config(
                "the roster must have both \"FName\" and \"LName\" columns (first name and last name)",
            ));
        };

        let mut roster = Self::default();
        for (row, record) in csv.records().enumerate() {
            let record = record?;
            let first = record.get(first_col).unwrap_or("");
            let last = record.get(last_col).unwrap_or("");
            if first.is_empty() || last.is_empty() {
                log::warn!("Roster row {} is missing a name, skipping", row + 2);
                continue;
            }
            roster.insert(RosterEntry::new(first, last)?);
        }

        log::debug!("Loaded {} roster entries", roster.len());
        Ok(roster)
    }

    fn insert(&mut self, entry: RosterEntry) {
        let key = entry.key();
        if self.index.contains_key(&key) {
            return;
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(entry);
    }

    /// Look up an entry by name, ignoring case.
    pub fn get(&self, first: &str, last: &str) -> Option<&RosterEntry> {
        let key = (first.trim().to_lowercase(), last.trim().to_lowercase());
        self.index.get(&key).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(first: &str, last: &str) -> RosterEntry {
        RosterEntry::new(first, last).unwrap()
    }

    #[test]
    fn test_placement_matches_with_any_spacing_and_case() {
        let e = entry("Jeff", "Pellis");
        assert!(e.matches_placement("2.Jeff Pellis        Hillsborough,NJ 41 M"));
        assert!(e.matches_placement("  12.JEFF    pellis  Hillsborough"));
        assert!(e.matches_placement("  12 Jeff Pellis"));
        assert!(e.matches_placement("3) Jeff\tPellis"));
    }

    #[test]
    fn test_placement_requires_leading_place() {
        let e = entry("Jeff", "Pellis");
        assert!(!e.matches_placement("Jeff Pellis 2"));
        assert!(!e.matches_placement("Team: 2.Jeff Pellis"));
    }

    #[test]
    fn test_surname_prefix_does_not_match() {
        let e = entry("Ed", "Ford");
        assert!(!e.matches_placement("7.Ed Fordham      Bedford,MA"));
        assert!(!e.matches_placement("7.Edward Ford      Bedford,MA"));
        assert!(e.matches_placement("7.Ed Ford      Bedford,MA"));
        assert!(!e.matches_name("60 Ted Fordham   New Bedford,MA"));
        assert!(!e.matches_name("60 Jed Ford   New Bedford,MA"));
    }

    #[test]
    fn test_name_matches_anywhere_and_reversed() {
        let e = entry("Lauren", "Rome");
        assert!(e.matches_name("14  2231  Lauren Rome  F 34"));
        assert!(e.matches_name("14  Rome, Lauren  F 34"));
        assert!(!e.matches_name("14  Lauren Romero  F 34"));
    }

    #[test]
    fn test_name_matches_last_first_without_comma() {
        let e = entry("Jeff", "Pellis");
        assert!(e.matches_name("  7 PELLIS JEFF          41 M  Hillsborough  35:40"));
        assert!(e.matches_name("  7 Pellis   Jeff  41 M"));
        assert!(!e.matches_name("  7 PELLIS JEFFREY      41 M"));
        assert!(!e.matches_name("  7 APELLIS JEFF        41 M"));
    }

    #[test]
    fn test_names_are_escaped() {
        let e = entry("J.", "O'Neil");
        assert!(e.matches_placement("4.J. O'Neil  Trenton"));
        assert!(!e.matches_placement("4.Jx O'Neil  Trenton"));
    }

    #[test]
    fn test_multi_word_names() {
        let e = entry("Mary Ann", "Van Dyke");
        assert!(e.matches_placement("9.Mary  Ann Van   Dyke  Princeton"));
    }

    #[test]
    fn test_from_reader_case_insensitive_columns() {
        let csv = "FName,LName,Email\nDan,Vassallo,dan@example.com\nJeff,Pellis,\n";
        let roster = Roster::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(roster.len(), 2);
        assert!(roster.get("dan", "VASSALLO").is_some());
    }

    #[test]
    fn test_from_reader_missing_columns() {
        let csv = "Name,Club\nDan Vassallo,RVRR\n";
        let err = Roster::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_from_reader_skips_blank_and_duplicate_rows() {
        let csv = "fname,lname\nDan,Vassallo\n,Nobody\nDAN,vassallo\n";
        let roster = Roster::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.entries()[0].display_name(), "Dan Vassallo");
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = Roster::load("/nonexistent/roster.csv").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
