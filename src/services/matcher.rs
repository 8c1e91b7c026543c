// src/services/matcher.rs

//! Result matcher.
//!
//! Filters extracted result lines down to the rows that belong to tracked
//! roster members.

use crate::models::{MatchMode, MatchedLine, Roster, RosterEntry};
use crate::utils::text::trim_line_end;

/// Select the lines that match the roster, in document order.
///
/// Each line is emitted at most once; when several roster entries match,
/// the first entry in roster order is recorded as the member.
pub fn match_lines(lines: &[String], roster: &Roster, mode: MatchMode) -> Vec<MatchedLine> {
    lines
        .iter()
        .filter_map(|raw| {
            let line = trim_line_end(raw);
            match mode {
                MatchMode::All => (!line.trim().is_empty()).then(|| MatchedLine {
                    text: line.to_string(),
                    member: String::new(),
                }),
                MatchMode::Placement => first_match(roster, |e| e.matches_placement(line))
                    .map(|entry| matched(line, entry)),
                MatchMode::Name => first_match(roster, |e| e.matches_name(line))
                    .map(|entry| matched(line, entry)),
            }
        })
        .collect()
}

fn first_match(roster: &Roster, test: impl Fn(&RosterEntry) -> bool) -> Option<&RosterEntry> {
    roster.entries().iter().find(|entry| test(entry))
}

fn matched(line: &str, entry: &RosterEntry) -> MatchedLine {
    MatchedLine {
        text: line.to_string(),
        member: entry.display_name(),
    }
}
