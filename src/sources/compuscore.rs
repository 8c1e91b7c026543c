// src/sources/compuscore.rs

//! Compuscore results.
//!
//! The race list comes from a gzip-compressed JSON API. Each event's detail
//! record lists its races and the result file for each; result files are
//! gzip-compressed HTML with the overall results in a `<pre>` that follows a
//! `<strong>` heading holding `<a name="overall">`.

use reqwest::blocking::Client;
use scraper::{ElementRef, Html};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{Candidate, DateRange, MatchMode, RaceDocument, ResultsBlock};
use crate::sources::{Candidates, RaceSource};
use crate::utils::text::{collapse_whitespace, lines};
use crate::utils::{element_text, http, select_text, selector};

const EVENTS_URL: &str = "http://www.compuscore.com/api/races/events";
const DETAIL_URL: &str = "http://www.compuscore.com/api/races/event-detail";

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    events: Vec<EventRef>,
}

#[derive(Debug, Deserialize)]
struct EventRef {
    #[serde(default)]
    id: Option<serde_json::Value>,
}

impl EventRef {
    fn id(&self) -> Option<String> {
        match self.id.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventDetail {
    #[serde(default)]
    events: Vec<EventInfo>,
}

#[derive(Debug, Deserialize)]
struct EventInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    races: Vec<RaceInfo>,
}

#[derive(Debug, Deserialize)]
struct RaceInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    result_files: Vec<ResultFile>,
}

#[derive(Debug, Deserialize)]
struct ResultFile {
    webfile: Option<WebFile>,
}

#[derive(Debug, Deserialize)]
struct WebFile {
    domain: Option<String>,
    resource: Option<String>,
}

/// Source for compuscore.com.
pub struct Compuscore {
    client: Client,
}

impl Compuscore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn event_candidates(&self, event: EventRef) -> Vec<Result<Candidate>> {
        let Some(id) = event.id() else {
            return vec![Err(AppError::parse("Compuscore event list", "event without an id"))];
        };
        let url = format!("{DETAIL_URL}?ids={id}");
        let detail = http::fetch_bytes(&self.client, &url)
            .and_then(|bytes| Ok(serde_json::from_slice::<EventDetail>(&bytes)?));
        match detail {
            Ok(detail) => candidates_from_detail(&id, detail),
            Err(e) => vec![Err(e)],
        }
    }
}

impl RaceSource for Compuscore {
    fn label(&self) -> &str {
        "Compuscore"
    }

    fn discover<'a>(&'a self, range: &DateRange, _regions: &[String]) -> Result<Candidates<'a>> {
        let url = format!(
            "{EVENTS_URL}?date_range={},{}",
            range.start().format("%Y-%m-%d"),
            range.stop().format("%Y-%m-%d")
        );
        log::info!("Downloading {}", url);
        let listing: EventList = serde_json::from_slice(&http::fetch_bytes(&self.client, &url)?)?;
        log::info!("Compuscore lists {} events", listing.events.len());

        Ok(Box::new(
            listing
                .events
                .into_iter()
                .flat_map(move |event| self.event_candidates(event)),
        ))
    }

    fn fetch(&self, candidate: &Candidate) -> Result<RaceDocument> {
        let text = http::fetch_text(&self.client, &candidate.url)?;
        Ok(RaceDocument::new(&candidate.url, text))
    }

    fn extract_results(&self, doc: &RaceDocument) -> Result<ResultsBlock> {
        parse_results(doc.primary())
            .map_err(|e| match e {
                AppError::Parse { message, .. } => AppError::parse(&doc.url, message),
                other => other,
            })
    }
}

/// One candidate per race of the event that has a result file.
fn candidates_from_detail(id: &str, detail: EventDetail) -> Vec<Result<Candidate>> {
    let Some(event) = detail.events.into_iter().next() else {
        return vec![Err(AppError::parse(
            format!("Compuscore event {id}"),
            "detail record has no events",
        ))];
    };
    log::info!("Examining {}", event.name);

    event
        .races
        .into_iter()
        .map(|race| {
            let context = format!("{} / {}", event.name, race.name);
            let webfile = race
                .result_files
                .into_iter()
                .find_map(|file| file.webfile)
                .ok_or_else(|| AppError::parse(&context, "no result files"))?;
            let (Some(domain), Some(resource)) = (webfile.domain, webfile.resource) else {
                return Err(AppError::parse(&context, "result file without a location"));
            };
            let url = format!("http://{domain}{resource}");
            Ok(Candidate::new(id, context, url))
        })
        .collect()
}

fn parse_results(html: &str) -> Result<ResultsBlock> {
    let document = Html::parse_document(html);
    let pre_sel = selector("strong + pre")?;
    let overall_sel = selector("a[name=\"overall\"]")?;

    let mut saw_pre = false;
    let pre = document.select(&pre_sel).find(|pre| {
        saw_pre = true;
        pre.prev_siblings()
            .filter_map(ElementRef::wrap)
            .next()
            .is_some_and(|strong| strong.select(&overall_sel).next().is_some())
    });
    let Some(pre) = pre else {
        let message = if saw_pre {
            "could not find overall results"
        } else {
            "no <strong><pre> element combination found"
        };
        return Err(AppError::parse("Compuscore results", message));
    };

    let strong_sel = selector("strong")?;
    let headings: Vec<String> = pre
        .select(&strong_sel)
        .map(|s| element_text(&s).trim_matches('\n').to_string())
        .collect();
    let banner = match headings.len() {
        0 => None,
        1 => Some(headings[0].clone()),
        _ => Some(headings[1..].join("\n")),
    };

    let race_name = match select_text(&document, "h2")? {
        Some(name) => name,
        None => collapse_whitespace(&element_text(
            &document
                .select(&overall_sel)
                .next()
                .ok_or_else(|| AppError::parse("Compuscore results", "no race name"))?,
        )),
    };
    let race_date = select_text(&document, "h3")?.filter(|d| !d.is_empty());

    Ok(ResultsBlock {
        race_name,
        race_date,
        banner,
        lines: lines(&element_text(&pre)),
        mode: MatchMode::Placement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS: &str = r#"<html><head><title>CJRRC Hangover 5K</title></head><body>
<h2>CJRRC HANGOVER 5K RUN</h2>
<h3>Sunday, March 7, 2015</h3>
<strong><big><font face="Arial Narrow"><a name="overall">CJRRC HANGOVER 5K RUN</a></font></big></strong>
<pre>
<strong>                    OVERALL RESULTS</strong>
<strong>Place Name                   City            Age S</strong>
<strong>===== ====================== =============== === =</strong>
    1.Mike Fast             Edison,NJ        25 M
    2.Jeff Pellis           Hillsborough,NJ  41 M
</pre>
</body></html>"#;

    #[test]
    fn test_parse_results() {
        let block = parse_results(RESULTS).unwrap();
        assert_eq!(block.race_name, "CJRRC HANGOVER 5K RUN");
        assert_eq!(block.race_date.as_deref(), Some("Sunday, March 7, 2015"));
        assert_eq!(block.mode, MatchMode::Placement);
        assert!(block.banner.as_deref().unwrap().starts_with("Place Name"));
        assert!(block.banner.as_deref().unwrap().contains("====="));
        assert!(
            block
                .lines
                .contains(&"    2.Jeff Pellis           Hillsborough,NJ  41 M".to_string())
        );
    }

    #[test]
    fn test_parse_results_is_repeatable() {
        let first = parse_results(RESULTS).unwrap();
        let second = parse_results(RESULTS).unwrap();
        assert_eq!(first.lines, second.lines);
    }

    #[test]
    fn test_parse_results_without_anchor() {
        let html = "<html><body><h2>Race</h2><p>Results coming soon</p></body></html>";
        let err = parse_results(html).unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
    }

    #[test]
    fn test_parse_results_without_overall() {
        let html = "<html><body><strong>Age groups</strong><pre>1.Someone</pre></body></html>";
        let err = parse_results(html).unwrap_err();
        assert!(err.to_string().contains("overall"));
    }

    #[test]
    fn test_candidates_from_detail_skips_races_without_files() {
        let detail: EventDetail = serde_json::from_str(
            r#"{"events":[{"name":"Hangover 5K","races":[
                {"name":"5K","result_files":[{"webfile":{"domain":"www.compuscore.com","resource":"/cs2015/march/hangover.htm"}}]},
                {"name":"Kids Fun Run","result_files":[]},
                {"name":"Walk","result_files":[{"webfile":{"domain":"www.compuscore.com"}}]}
            ]}]}"#,
        )
        .unwrap();

        let candidates = candidates_from_detail("123", detail);
        assert_eq!(candidates.len(), 3);
        let first = candidates[0].as_ref().unwrap();
        assert_eq!(first.url, "http://www.compuscore.com/cs2015/march/hangover.htm");
        assert_eq!(first.name, "Hangover 5K / 5K");
        assert!(candidates[1].is_err());
        assert!(candidates[2].is_err());
    }

    #[test]
    fn test_event_ids() {
        let list: EventList =
            serde_json::from_str(r#"{"events":[{"id":42},{"id":"77"},{"name":"no id"}]}"#).unwrap();
        let ids: Vec<Option<String>> = list.events.iter().map(EventRef::id).collect();
        assert_eq!(ids, vec![Some("42".into()), Some("77".into()), None]);
    }

    #[test]
    fn test_empty_event_list() {
        let list: EventList = serde_json::from_str(r#"{"events":[]}"#).unwrap();
        assert!(list.events.is_empty());
        let list: EventList = serde_json::from_str(r#"{}"#).unwrap();
        assert!(list.events.is_empty());
    }
}
