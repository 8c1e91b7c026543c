// src/sources/bestrace.rs

//! BestRace results.
//!
//! The yearly schedule page links every result file as
//! `http://www.bestrace.com/results/YY/YYMMDDxxx.HTM`; the date is read from
//! the file name. Result files keep the overall results in the second of two
//! adjacent `<pre>` blocks, with the column banner in a leading `<b>`.

use chrono::NaiveDate;
use regex::Regex;
use reqwest::blocking::Client;
use scraper::Html;

use crate::error::{AppError, Result};
use crate::models::{Candidate, DateRange, MatchMode, RaceDocument, ResultsBlock};
use crate::sources::{Candidates, RaceSource, dedup_by_url};
use crate::utils::text::lines;
use crate::utils::{element_text, http, select_text, selector};

const SCHEDULE_URL: &str = "http://www.bestrace.com/{year}schedule.html";

/// Source for bestrace.com.
pub struct BestRace {
    client: Client,
}

impl BestRace {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl RaceSource for BestRace {
    fn label(&self) -> &str {
        "BestRace"
    }

    fn discover<'a>(&'a self, range: &DateRange, _regions: &[String]) -> Result<Candidates<'a>> {
        let mut candidates = Vec::new();
        for year in range.years() {
            let url = SCHEDULE_URL.replace("{year}", &year.to_string());
            log::info!("Downloading {}", url);
            let schedule = http::fetch_text(&self.client, &url)?;
            candidates.extend(parse_schedule(&schedule, range)?);
        }
        let candidates = dedup_by_url(candidates);
        log::info!("BestRace lists {} races in range", candidates.len());
        Ok(Box::new(candidates.into_iter().map(Ok)))
    }

    fn fetch(&self, candidate: &Candidate) -> Result<RaceDocument> {
        let text = http::fetch_text(&self.client, &candidate.url)?;
        Ok(RaceDocument::new(&candidate.url, text))
    }

    fn extract_results(&self, doc: &RaceDocument) -> Result<ResultsBlock> {
        parse_results(doc.primary(), &doc.url)
    }
}

/// Result links in the schedule whose encoded date lies in range.
fn parse_schedule(schedule: &str, range: &DateRange) -> Result<Vec<Candidate>> {
    let re = Regex::new(
        r"(?i)http://www\.bestrace\.com/results/\d{2}/(\d{2})(\d{2})(\d{2})(\w+)\.HTM",
    )
    .map_err(|e| AppError::config(e.to_string()))?;

    let candidates = re
        .captures_iter(schedule)
        .filter_map(|caps| {
            let url = caps.get(0)?.as_str();
            let yy: i32 = caps[1].parse().ok()?;
            let mm: u32 = caps[2].parse().ok()?;
            let dd: u32 = caps[3].parse().ok()?;
            let Some(date) = NaiveDate::from_ymd_opt(2000 + yy, mm, dd) else {
                log::debug!("Ignoring {} (no valid date in file name)", url);
                return None;
            };
            if !range.contains(date) {
                return None;
            }
            let id = format!("{}{}{}{}", &caps[1], &caps[2], &caps[3], &caps[4]);
            Some(Candidate::new(id.clone(), id, url).with_date(date))
        })
        .collect();
    Ok(candidates)
}

fn parse_results(html: &str, url: &str) -> Result<ResultsBlock> {
    let document = Html::parse_document(html);
    let pre_sel = selector("pre + pre")?;
    let pre = document
        .select(&pre_sel)
        .next()
        .ok_or_else(|| AppError::parse(url, "no overall results <pre> block"))?;

    // <title>  Purple Stride 5K     - November 10, 2013   </title>
    let title = select_text(&document, "title")?
        .ok_or_else(|| AppError::parse(url, "no <title>"))?;
    let (race_name, race_date) = match title.split_once(" - ") {
        Some((name, date)) => (name.trim().to_string(), Some(date.trim().to_string())),
        None => (title.trim().to_string(), None),
    };

    let banner_sel = selector("pre + pre > b")?;
    let banner = document
        .select(&banner_sel)
        .next()
        .map(|b| element_text(&b).trim_matches('\n').to_string());

    Ok(ResultsBlock {
        race_name,
        race_date: race_date.filter(|d| !d.is_empty()),
        banner,
        lines: lines(&element_text(&pre)),
        mode: MatchMode::Name,
    })
}
