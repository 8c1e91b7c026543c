// src/sources/lmsports.rs

//! L&M Computer Sports results.
//!
//! One page per year (`resultsYY.htm`) lists every race as
//!
//! ```text
//! <a href="trail13.htm">Trail of Two Cities 5k Run</a>
//! - Saturday, November 2, 2013 - OC/Somers Point, NJ -
//! ```
//!
//! Result pages are plain text in a `<pre>` with an `age ... =====` banner.

use chrono::NaiveDate;
use regex::Regex;
use reqwest::blocking::Client;
use scraper::Html;

use crate::error::{AppError, Result};
use crate::models::{Candidate, DateRange, MatchMode, RaceDocument, ResultsBlock};
use crate::sources::{Candidates, RaceSource, dedup_by_url};
use crate::utils::text::{collapse_whitespace, lines};
use crate::utils::{element_text, http, selector};

const BASE_URL: &str = "http://www.lmsports.com/";

/// Source for lmsports.com.
pub struct LmSports {
    client: Client,
}

impl LmSports {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl RaceSource for LmSports {
    fn label(&self) -> &str {
        "L&M Sports"
    }

    fn discover<'a>(&'a self, range: &DateRange, _regions: &[String]) -> Result<Candidates<'a>> {
        let mut candidates = Vec::new();
        for year in range.years() {
            let yy = format!("{:02}", year % 100);
            let url = format!("{BASE_URL}results{yy}.htm");
            log::info!("Downloading {}.", url);
            let master = http::fetch_text(&self.client, &url)?;
            candidates.extend(parse_master(&master, &yy, range)?);
        }
        let candidates = dedup_by_url(candidates);
        log::info!("L&M Sports lists {} races in range", candidates.len());
        Ok(Box::new(candidates.into_iter().map(Ok)))
    }

    fn fetch(&self, candidate: &Candidate) -> Result<RaceDocument> {
        log::info!("Downloading {}.", candidate.url);
        let text = http::fetch_text(&self.client, &candidate.url)?;
        Ok(RaceDocument::new(&candidate.url, text))
    }

    fn extract_results(&self, doc: &RaceDocument) -> Result<ResultsBlock> {
        parse_results(doc.primary(), &doc.url)
    }
}

/// Races on the yearly page dated within range.
fn parse_master(master: &str, yy: &str, range: &DateRange) -> Result<Vec<Candidate>> {
    let pattern = format!(
        r#"(?is)<a\s+href="(\w*?{yy}\.htm)">\s*(.*?)\s*</a>\s*-\s*([A-Z][a-z]*?),\s*(.*?)\s+(\d+),\s+(\d+)\s*-"#
    );
    let re = Regex::new(&pattern).map_err(|e| AppError::config(e.to_string()))?;

    let candidates = re
        .captures_iter(master)
        .filter_map(|caps| {
            let href = &caps[1];
            let name = collapse_whitespace(&caps[2]);
            let datestring = format!("{} {} {}", caps[4].trim(), &caps[5], &caps[6]);
            let Ok(date) = NaiveDate::parse_from_str(&datestring, "%B %d %Y") else {
                log::warn!("Skipping {} (unreadable date \"{}\")", name, datestring);
                return None;
            };
            if !range.contains(date) {
                log::debug!("Skipping {}...", name);
                return None;
            }
            Some(Candidate::new(href, name, format!("{BASE_URL}{href}")).with_date(date))
        })
        .collect();
    Ok(candidates)
}

fn parse_results(html: &str, url: &str) -> Result<ResultsBlock> {
    // <TITLE>Cooper Norcross Run the Bridge 10k</TITLE>
    let title_re = Regex::new(r"(?i)<title>(.*)</title>").map_err(|e| AppError::config(e.to_string()))?;
    let race_name = title_re
        .captures(html)
        .map(|caps| collapse_whitespace(&caps[1]))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::parse(url, "could not find the title"))?;

    let banner_re =
        Regex::new(r"(?s)\r?\n(\s*age.*?=====)\r?\n").map_err(|e| AppError::config(e.to_string()))?;
    let banner = banner_re
        .captures(html)
        .map(|caps| caps[1].trim_matches(|c| c == '\r' || c == '\n').replace('\r', ""))
        .ok_or_else(|| AppError::parse(url, "could not parse out the banner"))?;

    let document = Html::parse_document(html);
    let pre_sel = selector("pre")?;
    let text = match document.select(&pre_sel).next() {
        Some(pre) => element_text(&pre),
        None => document.root_element().text().collect(),
    };

    Ok(ResultsBlock {
        race_name,
        race_date: None,
        banner: Some(banner),
        lines: lines(&text),
        mode: MatchMode::Name,
    })
}
