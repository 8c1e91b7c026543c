// src/sources/nyrr.rs

//! New York Road Runners results.
//!
//! NYRR results are searched by team rather than filtered against the
//! roster. The archive page posts a year to get that year's race list; each
//! race leads to a search form which is posted with the team code. The
//! search session lives in cookies, so the shared client must keep them.

use chrono::NaiveDate;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Node};

use crate::error::{AppError, Result};
use crate::models::{Candidate, DateRange, MatchMode, RaceDocument, ResultsBlock};
use crate::sources::{Candidates, RaceSource, dedup_by_url};
use crate::utils::text::collapse_whitespace;
use crate::utils::{element_text, http, resolve, selector};

const ARCHIVE_URL: &str = "http://web2.nyrrc.org/cgi-bin/start.cgi/aes-programs/results/resultsarchive.htm";

/// Every race result link points into this startup page.
const RESULT_URL_BASE: &str = "http://web2.nyrrc.org/cgi-bin/start.cgi/aes-programs/results/startup.html";

const NO_MATCH: &str = "Your search returns no match.";

/// Source for nyrr.org team results.
pub struct NewYorkRR {
    client: Client,
    team: String,
}

impl NewYorkRR {
    pub fn new(client: Client, team: &str) -> Self {
        Self {
            client,
            team: team.to_string(),
        }
    }

    fn team_search(&self) -> [(&str, &str); 11] {
        [
            ("search.method", "search.team"),
            ("input.lname", ""),
            ("input.fname", ""),
            ("input.bib", ""),
            ("overalltype", "All"),
            ("input.agegroup.m", "12 to 19"),
            ("input.agegroup.f", "12 to 19"),
            ("teamgender", ""),
            ("team_code", self.team.as_str()),
            ("items.display", "500"),
            (
                "AESTIVACVNLIST",
                "overalltype,input.agegroup.m,input.agegroup.f,teamgenderteam_code",
            ),
        ]
    }
}

impl RaceSource for NewYorkRR {
    fn label(&self) -> &str {
        "NYRR"
    }

    fn discover<'a>(&'a self, range: &DateRange, _regions: &[String]) -> Result<Candidates<'a>> {
        if self.team.trim().is_empty() {
            return Err(AppError::config("NYRR needs a team code"));
        }

        log::info!("Downloading {}", ARCHIVE_URL);
        let archive = http::fetch_text(&self.client, ARCHIVE_URL)?;
        let action = form_action(&archive, "form[name=\"findOtherRaces\"]", ARCHIVE_URL)?;

        let mut candidates = Vec::new();
        for year in range.years() {
            let year = year.to_string();
            let form = [("NYRRYEAR", year.as_str()), ("AESTIVACVNLIST", "NYRRYEAR")];
            let listing = http::post_form(&self.client, &action, &form)?;
            candidates.extend(parse_race_list(&listing, range)?);
        }

        let candidates = dedup_by_url(candidates);
        log::info!("NYRR lists {} races in range", candidates.len());
        Ok(Box::new(candidates.into_iter().map(Ok)))
    }

    /// Post the team search on the race's search page.
    fn fetch(&self, candidate: &Candidate) -> Result<RaceDocument> {
        let page = http::fetch_text(&self.client, &candidate.url)?;
        let action = form_action(&page, "form", &candidate.url)?;
        let markup = http::post_form(&self.client, &action, &self.team_search())?;
        Ok(RaceDocument::new(&candidate.url, markup))
    }

    fn extract_results(&self, doc: &RaceDocument) -> Result<ResultsBlock> {
        parse_results(doc.primary(), &doc.url)
    }
}

/// Absolute action URL of the first form matching `css`.
fn form_action(html: &str, css: &str, base: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let form_sel = selector(css)?;
    let action = document
        .select(&form_sel)
        .next()
        .and_then(|form| form.value().attr("action"))
        .ok_or_else(|| AppError::parse(base, format!("no {css} with an action")))?;
    resolve(base, action).ok_or_else(|| AppError::parse(base, format!("bad form action {action}")))
}

/// Races in the year listing dated within range.
///
/// Each link is followed by its date as `MM/DD/YY` text.
fn parse_race_list(listing: &str, range: &DateRange) -> Result<Vec<Candidate>> {
    let document = Html::parse_document(listing);
    let link_sel = selector("a[href]")?;

    let mut candidates = Vec::new();
    for link in document.select(&link_sel) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !href.contains(RESULT_URL_BASE) {
            continue;
        }
        let url = href.replace("&amp;", "&");
        let race_name = collapse_whitespace(&element_text(&link));

        let tail = match link.next_sibling().map(|n| n.value()) {
            Some(Node::Text(text)) => text.trim().to_string(),
            _ => String::new(),
        };
        let date_text = tail.split_whitespace().next().unwrap_or_default();
        let Ok(date) = NaiveDate::parse_from_str(date_text, "%m/%d/%y") else {
            log::warn!("Skipping {} (no race date)", race_name);
            continue;
        };

        if range.contains(date) {
            log::info!("Keeping {}", race_name);
            candidates.push(Candidate::new(&url, race_name, &url).with_date(date));
        } else {
            log::debug!("Skipping {}", race_name);
        }
    }
    Ok(candidates)
}

fn parse_results(markup: &str, url: &str) -> Result<ResultsBlock> {
    if markup.contains(NO_MATCH) {
        log::debug!("No team results at {}", url);
        return Ok(ResultsBlock {
            mode: MatchMode::All,
            ..ResultsBlock::default()
        });
    }

    let document = Html::parse_document(markup);
    let table_sel = selector("table")?;
    let tables: Vec<ElementRef> = document.select(&table_sel).collect();
    if tables.len() < 4 {
        return Err(AppError::parse(url, format!("expected 4 tables, found {}", tables.len())));
    }

    // Race name, "list by team" and distance/time/location spans.
    let meta_sel = selector("td:nth-child(3)")?;
    let span_sel = selector("span")?;
    let spans: Vec<String> = tables[1]
        .select(&meta_sel)
        .next()
        .map(|td| {
            td.select(&span_sel)
                .map(|s| collapse_whitespace(&element_text(&s)))
                .collect()
        })
        .unwrap_or_default();
    let race_name = spans
        .first()
        .filter(|n| !n.is_empty())
        .cloned()
        .ok_or_else(|| AppError::parse(url, "no race name"))?;
    let race_date = spans.get(2).filter(|d| !d.is_empty()).cloned();

    let row_sel = selector("tr")?;
    let mut rows = tables[3].select(&row_sel).map(|tr| {
        tr.children()
            .filter_map(ElementRef::wrap)
            .map(|td| collapse_whitespace(&element_text(&td)))
            .collect::<Vec<_>>()
            .join("  ")
    });
    let banner = rows.next().filter(|b| !b.trim().is_empty());
    let lines = rows.collect();

    Ok(ResultsBlock {
        race_name,
        race_date,
        banner,
        lines,
        mode: MatchMode::All,
    })
}
