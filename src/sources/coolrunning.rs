// src/sources/coolrunning.rs

//! CoolRunning results.
//!
//! Each state has a yearly listing (`/results/YY/<state>.shtml`) linking race
//! files named after the race date, e.g. `/results/15/ma/Mar8_Boston_set1.shtml`.
//! Large races split their results across `..._set1`, `..._set2`, ... files.
//!
//! CoolRunning hosts files from many timing companies. The company is named
//! in `<meta name="Author">` and decides the layout: most publish a plain
//! `<pre>` block, Cape Cod Road Runners publish a table, and a few series
//! use layouts that are not worth scraping.

use chrono::NaiveDate;
use regex::Regex;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html};

use crate::error::{AppError, Result};
use crate::models::{Candidate, DateRange, MatchMode, RaceDocument, ResultsBlock};
use crate::sources::{Candidates, RaceSource, dedup_by_url};
use crate::utils::text::{collapse_whitespace, lines};
use crate::utils::{element_text, http, select_text, selector};

const BASE_URL: &str = "http://www.coolrunning.com";

/// Companies publishing a results table after the race headings.
const TABLE_AUTHORS: [&str; 2] = ["CapeCodRoadRunners", "GreenfieldRecreation"];

/// Companies known to publish the plain `<pre>` layout.
const PRE_AUTHORS: [&str; 19] = [
    "ACCU", "baystate", "charlie", "gstate", "Harrier", "netiming", "JFRC", "mmg1214", "mooserd",
    "Spitler", "SWCL", "yk", "kick610", "JB Race", "ab-mac", "FTO", "NSTC", "ndatrackxc", "wcrc",
];

/// Series whose layouts are skipped.
const SKIPPED_AUTHORS: [&str; 10] = [
    "colonial",
    "opportunity",
    "Harriers",
    "jalfano",
    "DavidWill",
    "FFAST",
    "lungne",
    "northeastracers",
    "sri",
    "WCRCSCOTT",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Table,
    Pre,
    Skipped,
}

fn layout_for(author: Option<&str>, url: &str) -> Layout {
    match author {
        Some(a) if TABLE_AUTHORS.contains(&a) => Layout::Table,
        Some(a) if PRE_AUTHORS.contains(&a) => Layout::Pre,
        Some(a) if SKIPPED_AUTHORS.contains(&a) => Layout::Skipped,
        Some(a) => {
            log::warn!("Unknown race company \"{}\" for {}, trying the plain layout", a, url);
            Layout::Pre
        }
        None => {
            log::warn!("No race company named in {}, trying the plain layout", url);
            Layout::Pre
        }
    }
}

/// Source for coolrunning.com.
pub struct CoolRunning {
    client: Client,
}

impl CoolRunning {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl RaceSource for CoolRunning {
    fn label(&self) -> &str {
        "CoolRunning"
    }

    fn discover<'a>(&'a self, range: &DateRange, regions: &[String]) -> Result<Candidates<'a>> {
        if regions.is_empty() {
            return Err(AppError::config("CoolRunning needs at least one state"));
        }

        let mut candidates = Vec::new();
        for state in regions {
            let state = state.to_lowercase();
            for year in range.years() {
                let yy = format!("{:02}", year % 100);
                let url = format!("{BASE_URL}/results/{yy}/{state}.shtml");
                log::info!("Processing {} ({})", state, url);
                let listing = http::fetch_text(&self.client, &url)?;
                candidates.extend(parse_state_listing(&listing, &yy, &state, range)?);
            }
        }

        let candidates = dedup_by_url(candidates);
        log::info!("CoolRunning lists {} races in range", candidates.len());
        Ok(Box::new(candidates.into_iter().map(Ok)))
    }

    fn fetch(&self, candidate: &Candidate) -> Result<RaceDocument> {
        let text = http::fetch_text(&self.client, &candidate.url)?;
        Ok(RaceDocument::new(&candidate.url, text))
    }

    fn extract_results(&self, doc: &RaceDocument) -> Result<ResultsBlock> {
        parse_results(doc.primary(), &doc.url)
    }

    fn follow_ups(&self, doc: &RaceDocument) -> Vec<Candidate> {
        secondary_files(doc.primary(), &doc.url)
    }
}

/// Race files in a state listing whose date lies in range.
fn parse_state_listing(
    listing: &str,
    yy: &str,
    state: &str,
    range: &DateRange,
) -> Result<Vec<Candidate>> {
    let pattern = format!(
        r#"/results/{yy}/{}/([A-Za-z]{{3}})(\d{{1,2}})_[^"'\s<>]*?\.shtml"#,
        regex::escape(state)
    );
    log::debug!("Match pattern is {}", pattern);
    let re = Regex::new(&pattern).map_err(|e| AppError::config(e.to_string()))?;
    let year = 2000 + yy.parse::<i32>().unwrap_or(0);

    let candidates = re
        .captures_iter(listing)
        .filter_map(|caps| {
            let path = caps.get(0)?.as_str();
            let month = month_number(&caps[1])?;
            let day: u32 = caps[2].parse().ok()?;
            let date = NaiveDate::from_ymd_opt(year, month, day)?;
            if !range.contains(date) {
                return None;
            }
            let file = path.rsplit('/').next().unwrap_or(path);
            Some(Candidate::new(file, file, format!("{BASE_URL}{path}")).with_date(date))
        })
        .collect();
    Ok(candidates)
}

fn month_number(abbrev: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let abbrev = abbrev.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == abbrev)
        .map(|i| i as u32 + 1)
}

/// Sibling set files linked from a race file.
///
/// For `TheRace_set1.shtml` these are the `./TheRace_setN.shtml` links.
fn secondary_files(html: &str, url: &str) -> Vec<Candidate> {
    let Some((dir, file)) = url.rsplit_once('/') else {
        return Vec::new();
    };
    let Some(stem) = file.strip_suffix(".shtml") else {
        return Vec::new();
    };
    let mut base_chars = stem.chars();
    base_chars.next_back();
    let base = base_chars.as_str();
    if base.is_empty() {
        return Vec::new();
    }

    let pattern = format!(r#"(?i)<a\s+href="\./({}\d+\.shtml)""#, regex::escape(base));
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };

    let found: Vec<Candidate> = re
        .captures_iter(html)
        .map(|caps| caps[1].to_string())
        .filter(|inner| inner != file)
        .map(|inner| Candidate::new(inner.clone(), inner.clone(), format!("{dir}/{inner}")))
        .collect();
    dedup_by_url(found)
}

fn parse_results(html: &str, url: &str) -> Result<ResultsBlock> {
    let document = Html::parse_document(html);

    let author_sel = selector("meta[name=\"Author\"]")?;
    let author = document
        .select(&author_sel)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(str::trim);

    let layout = layout_for(author, url);
    if layout == Layout::Skipped {
        return Err(AppError::unsupported(
            url,
            format!("skipping {} race series", author.unwrap_or_default()),
        ));
    }

    // The H1 tag has the race name, the H2 tag the location and date.
    let race_name = match select_text(&document, "h1")? {
        Some(name) if !name.is_empty() => name,
        _ => select_text(&document, "title")?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::parse(url, "no race name"))?,
    };
    let race_date = select_text(&document, "h2")?.filter(|d| !d.is_empty());

    let (banner, lines, mode) = match layout {
        Layout::Table => table_rows(&document, url)?,
        _ => pre_rows(&document, url)?,
    };

    Ok(ResultsBlock {
        race_name,
        race_date,
        banner,
        lines,
        mode,
    })
}

type Rows = (Option<String>, Vec<String>, MatchMode);

/// Plain layout: the first `<pre>`; everything before first place is the banner.
fn pre_rows(document: &Html, url: &str) -> Result<Rows> {
    let pre_sel = selector("pre")?;
    let pre = document
        .select(&pre_sel)
        .next()
        .ok_or_else(|| AppError::parse(url, "no <pre> element found"))?;

    let rows = lines(&element_text(&pre));
    let first_place = Regex::new(r"^\s*1\b").map_err(|e| AppError::config(e.to_string()))?;
    let banner: Vec<&str> = rows
        .iter()
        .take_while(|line| !first_place.is_match(line))
        .map(String::as_str)
        .collect();
    let banner = banner.join("\n").trim_matches('\n').to_string();

    Ok((
        (!banner.trim().is_empty()).then_some(banner),
        rows,
        MatchMode::Name,
    ))
}

/// Table layout: rows of the table following the race headings.
fn table_rows(document: &Html, url: &str) -> Result<Rows> {
    let row_sel = selector("h1 + h2 + h3 + p.subhead + table tr")?;
    let rows: Vec<String> = document
        .select(&row_sel)
        .filter_map(|tr| {
            let cells: Vec<String> = tr
                .children()
                .filter_map(ElementRef::wrap)
                .map(|td| collapse_whitespace(&element_text(&td)))
                .collect();
            // Incomplete rows carry no runner.
            (cells.len() >= 3).then(|| cells.join("  "))
        })
        .collect();

    let mut rows = rows.into_iter();
    let banner = rows
        .next()
        .ok_or_else(|| AppError::parse(url, "no results table after the race headings"))?;
    Ok((Some(banner), rows.collect(), MatchMode::Name))
}
