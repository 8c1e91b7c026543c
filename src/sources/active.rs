// src/sources/active.rs

//! Active.com results.
//!
//! The search page lists events per region. Each event page carries a
//! navigation bar whose links lead to the hosted result listings; those
//! listings are paginated tables of class `participant-list`.

use std::collections::HashSet;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Candidate, DateRange, MatchMode, RaceDocument, ResultsBlock};
use crate::sources::{Candidates, RaceSource};
use crate::utils::text::collapse_whitespace;
use crate::utils::{element_text, http, select_text, selector};

const BASE_URL: &str = "http://results.active.com";
const SEARCH_URL: &str = "http://results.active.com/search";

/// Result listings are not expected to run past this many pages.
const MAX_PAGES: usize = 200;

/// One event row from the search listing.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EventRow {
    name: String,
    location: String,
    date: String,
    href: String,
}

/// Source for results.active.com.
pub struct Active {
    client: Client,
}

impl Active {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Result listings linked from one event page.
    fn event_candidates(&self, row: EventRow) -> Vec<Result<Candidate>> {
        let url = format!("{BASE_URL}{}", row.href);
        log::info!("Looking at {}, {}, {}", row.name, row.location, row.date);
        let page = match http::fetch_text(&self.client, &url) {
            Ok(page) => page,
            Err(e) => return vec![Err(e)],
        };
        let date = NaiveDate::parse_from_str(&row.date, "%m/%d/%Y").ok();

        match parse_event_nav(&page) {
            Ok(links) => links
                .into_iter()
                .map(|(label, href)| {
                    let name = format!("{} / {}", row.name, label);
                    let candidate = Candidate::new(&row.href, name, format!("{BASE_URL}{href}"));
                    Ok(match date {
                        Some(date) => candidate.with_date(date),
                        None => candidate,
                    })
                })
                .collect(),
            Err(e) => vec![Err(e)],
        }
    }
}

impl RaceSource for Active {
    fn label(&self) -> &str {
        "Active.com"
    }

    fn discover<'a>(&'a self, range: &DateRange, regions: &[String]) -> Result<Candidates<'a>> {
        if regions.is_empty() {
            return Err(AppError::config("Active needs at least one state"));
        }

        let start = range.start().format("%Y-%m-%d").to_string();
        let stop = range.stop().format("%Y-%m-%d").to_string();
        let mut rows = Vec::new();
        for state in regions {
            log::info!("Searching for results in {}...", state);
            let query = [
                ("search[source]", "event"),
                ("search[query]", state.as_str()),
                ("search[start_date]", start.as_str()),
                ("search[end_date]", stop.as_str()),
            ];
            let listing = http::fetch_text_with_query(&self.client, SEARCH_URL, &query)?;
            rows.extend(parse_search(&listing, state)?);
        }
        log::info!("Active lists {} events in range", rows.len());

        Ok(Box::new(
            rows.into_iter()
                .flat_map(move |row| self.event_candidates(row)),
        ))
    }

    /// Download the first listing page and every page reached through "Next".
    fn fetch(&self, candidate: &Candidate) -> Result<RaceDocument> {
        let first = http::fetch_text(&self.client, &candidate.url)?;
        let mut next = next_page(&first)?;
        let mut doc = RaceDocument::new(&candidate.url, first);
        let mut seen = HashSet::from([candidate.url.clone()]);

        while let Some(href) = next.take() {
            let url = format!("{BASE_URL}{href}");
            if !seen.insert(url.clone()) || doc.pages.len() >= MAX_PAGES {
                break;
            }
            log::debug!("\t\t{}", href);
            let page = http::fetch_text(&self.client, &url)?;
            next = next_page(&page)?;
            doc.pages.push(page);
        }
        Ok(doc)
    }

    fn extract_results(&self, doc: &RaceDocument) -> Result<ResultsBlock> {
        parse_results(&doc.pages, &doc.url)
    }
}

/// Event rows located in `state`.
///
/// Rows missing a title, location or date are skipped with a warning.
fn parse_search(listing: &str, state: &str) -> Result<Vec<EventRow>> {
    let document = Html::parse_document(listing);
    let row_sel = selector(".result-row")?;
    let title_sel = selector(".result-title a[href]")?;
    let location_sel = selector(".result-sub-location")?;
    let date_sel = selector(".result-extras .date")?;

    let mut rows = Vec::new();
    for row in document.select(&row_sel) {
        let title = row.select(&title_sel).next();
        let location = first_text(&row, &location_sel);
        let date = first_text(&row, &date_sel);
        let (Some(title), Some(location), Some(date)) = (title, location, date) else {
            log::warn!("Skipping search row with missing title, location or date");
            continue;
        };

        let name = collapse_whitespace(&element_text(&title));
        if !location.split_whitespace().any(|word| word == state) {
            log::info!("Skipping {}, state mismatch ({})", name, location);
            continue;
        }
        let Some(href) = title.value().attr("href") else {
            continue;
        };

        rows.push(EventRow {
            name,
            location,
            date: date.trim_start_matches("Date:").trim().to_string(),
            href: href.to_string(),
        });
    }
    Ok(rows)
}

fn first_text(row: &ElementRef<'_>, sel: &Selector) -> Option<String> {
    row.select(sel)
        .next()
        .map(|el| collapse_whitespace(&element_text(&el)))
        .filter(|t| !t.is_empty())
}

/// `(label, href)` of the result listings in an event page's navigation.
///
/// An event that only links to official results hosted elsewhere has none.
fn parse_event_nav(page: &str) -> Result<Vec<(String, String)>> {
    let document = Html::parse_document(page);
    let link_sel = selector(".event-nav a[href]")?;

    let mut links = Vec::new();
    for link in document.select(&link_sel) {
        let label = collapse_whitespace(&element_text(&link));
        if label.starts_with("Link for Official Results") {
            log::info!("\tNo results here, just forget it");
            return Ok(Vec::new());
        }
        if ["Event Overview", "Searchable", "Event's Website"]
            .iter()
            .any(|skip| label.starts_with(skip))
        {
            log::debug!("\tSkipping \"{}\"", label);
            continue;
        }
        if let Some(href) = link.value().attr("href") {
            links.push((label, href.to_string()));
        }
    }
    Ok(links)
}

/// Href of the "Next" pagination link, if any.
fn next_page(page: &str) -> Result<Option<String>> {
    let document = Html::parse_document(page);
    let link_sel = selector(".pagination a[rel]")?;
    Ok(document
        .select(&link_sel)
        .find(|a| element_text(a).trim_start().starts_with("Next"))
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string))
}

fn parse_results(pages: &[String], url: &str) -> Result<ResultsBlock> {
    let first = pages
        .first()
        .map(|p| Html::parse_document(p))
        .ok_or_else(|| AppError::parse(url, "empty document"))?;

    let race_name = select_text(&first, ".page-heading .headers h1")?
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::parse(url, "no race heading"))?;
    let race_date = select_text(&first, ".page-heading .headers h3 time")?.filter(|d| !d.is_empty());

    let table_sel = selector(".participant-list")?;
    let row_sel = selector("tr")?;

    let mut banner = None;
    let mut lines = Vec::new();
    let mut tables = 0;
    for page in pages {
        let document = Html::parse_document(page);
        for table in document.select(&table_sel) {
            tables += 1;
            let mut rows = table.select(&row_sel);
            // The first row holds column headings.
            let header = rows.next();
            if banner.is_none() {
                banner = header.map(|tr| row_text(&tr).join("  "));
            }
            lines.extend(
                rows.map(|tr| row_text(&tr))
                    .filter(|cells| cells.len() >= 3)
                    .map(|cells| cells.join("  ")),
            );
        }
    }
    if tables == 0 {
        return Err(AppError::parse(url, "no participant list"));
    }

    Ok(ResultsBlock {
        race_name,
        race_date,
        banner: banner.filter(|b| !b.is_empty()),
        lines,
        mode: MatchMode::Name,
    })
}

fn row_text(tr: &ElementRef) -> Vec<String> {
    tr.children()
        .filter_map(ElementRef::wrap)
        .map(|cell| collapse_whitespace(&element_text(&cell)))
        .collect()
}
