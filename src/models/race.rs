//! Race data structures passed between sources, matcher and renderer.

use chrono::{Datelike, NaiveDate};

use crate::error::{AppError, Result};

/// Inclusive calendar range restricting which races are searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    stop: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting a start that falls after the stop.
    pub fn new(start: NaiveDate, stop: NaiveDate) -> Result<Self> {
        if start > stop {
            return Err(AppError::config(format!(
                "start date {start} is after stop date {stop}"
            )));
        }
        Ok(Self { start, stop })
    }

    /// A range covering a single day.
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            stop: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn stop(&self) -> NaiveDate {
        self.stop
    }

    /// Whether the date lies within the range (both ends inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.stop
    }

    /// Every calendar year touched by the range, in order.
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start.year()..=self.stop.year()
    }
}

/// A discovered reference to a race whose results may list tracked members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Site-specific identifier
    pub id: String,

    /// Display name used in diagnostics
    pub name: String,

    /// Result page URL
    pub url: String,

    /// Race date when the listing provides one; fills in for a page without a date heading
    pub date: Option<NaiveDate>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            date: None,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Raw fetched content of one race.
///
/// Paginated result listings are fetched into a single document; `pages[0]`
/// is always the page at `url`.
#[derive(Debug, Clone)]
pub struct RaceDocument {
    pub url: String,
    pub pages: Vec<String>,
}

impl RaceDocument {
    pub fn new(url: impl Into<String>, content: String) -> Self {
        Self {
            url: url.into(),
            pages: vec![content],
        }
    }

    /// The first (or only) page.
    pub fn primary(&self) -> &str {
        self.pages.first().map(String::as_str).unwrap_or("")
    }
}

/// How result lines are compared against the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Line starts with a placement followed by the member's name
    #[default]
    Placement,
    /// Member's name appears anywhere in the line
    Name,
    /// The site already filtered the rows; keep every one
    All,
}

/// The results block located inside a race document.
#[derive(Debug, Clone, Default)]
pub struct ResultsBlock {
    pub race_name: String,
    pub race_date: Option<String>,
    /// Column headings, copied verbatim from the source
    pub banner: Option<String>,
    /// Result rows in document order
    pub lines: Vec<String>,
    pub mode: MatchMode,
}

/// A result row that satisfied the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedLine {
    pub text: String,
    /// Display name of the roster entry that matched (empty for pre-filtered rows)
    pub member: String,
}

/// Link back to the complete results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    /// Site name, e.g. "Compuscore"
    pub label: String,
    pub url: String,
}

/// One race's matched results, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RaceCard {
    pub race_name: String,
    pub race_date: Option<String>,
    pub source: Option<Attribution>,
    pub banner: Option<String>,
    pub lines: Vec<String>,
}

impl RaceCard {
    /// Build a card from an extracted block and its matched rows.
    pub fn from_block(block: &ResultsBlock, matched: &[MatchedLine], source: Attribution) -> Self {
        Self {
            race_name: block.race_name.clone(),
            race_date: block.race_date.clone(),
            source: Some(source),
            banner: block.banner.clone(),
            lines: matched.iter().map(|m| m.text.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        assert!(DateRange::new(day(2015, 3, 8), day(2015, 3, 7)).is_err());
        assert!(DateRange::new(day(2015, 3, 7), day(2015, 3, 7)).is_ok());
    }

    #[test]
    fn test_date_range_contains_inclusive() {
        let range = DateRange::new(day(2015, 3, 7), day(2015, 3, 9)).unwrap();
        assert!(range.contains(day(2015, 3, 7)));
        assert!(range.contains(day(2015, 3, 9)));
        assert!(!range.contains(day(2015, 3, 10)));
        assert!(!range.contains(day(2015, 3, 6)));
    }

    #[test]
    fn test_date_range_years() {
        let range = DateRange::new(day(2014, 12, 30), day(2015, 1, 2)).unwrap();
        assert_eq!(range.years().collect::<Vec<_>>(), vec![2014, 2015]);
    }

    #[test]
    fn test_document_primary() {
        let doc = RaceDocument::new("http://example.com", "<html></html>".into());
        assert_eq!(doc.primary(), "<html></html>");
    }
}
