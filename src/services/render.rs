// src/services/render.rs

//! Race card rendering.
//!
//! A card is a `<div class="race">` holding a separator, the race name, the
//! optional date, the optional attribution and the matched rows:
//!
//! ```text
//! <div class="race">
//! <hr class="race_header">
//! <h1>Purple Stride 5K</h1>
//! <h2>November 10, 2013</h2>
//! <p><span>Complete results </span><a href="...">here</a><span> on BestRace.</span></p>
//! <pre class="actual_results">
//! <b class="banner">Place Name ...</b>
//!   12 AIDAN WALSH ...</pre>
//! </div>
//! ```

use scraper::{ElementRef, Html, Node};

use crate::models::{Attribution, RaceCard};
use crate::utils::text::{escape_html, normalize};
use crate::utils::{element_text, selector};

const CARD_SELECTOR: &str = "div.race";

/// Render a card as an HTML fragment.
///
/// Matched lines are written verbatim apart from whitespace normalization.
pub fn render(card: &RaceCard) -> String {
    let mut html = String::new();
    html.push_str("<div class=\"race\">\n");
    html.push_str("<hr class=\"race_header\">\n");
    html.push_str(&format!("<h1>{}</h1>\n", text(&card.race_name)));

    if let Some(date) = card.race_date.as_deref().filter(|d| !d.trim().is_empty()) {
        html.push_str(&format!("<h2>{}</h2>\n", text(date)));
    }

    if let Some(source) = &card.source {
        html.push_str(&format!(
            "<p><span>Complete results </span><a href=\"{}\">here</a><span> on {}.</span></p>\n",
            escape_html(&source.url),
            text(&source.label),
        ));
    }

    // The newline after <pre> is dropped by HTML parsers.
    html.push_str("<pre class=\"actual_results\">\n");
    if let Some(banner) = card.banner.as_deref().filter(|b| !b.trim().is_empty()) {
        html.push_str(&format!("<b class=\"banner\">{}</b>\n", text(banner)));
    }
    let body: Vec<String> = card.lines.iter().map(|line| text(line)).collect();
    html.push_str(&body.join("\n"));
    html.push_str("</pre>\n");
    html.push_str("</div>");
    html
}

fn text(s: &str) -> String {
    escape_html(normalize(s).trim_end_matches('\n'))
}

/// Read every top-level card back out of a document or fragment.
pub fn parse_cards(html: &str) -> Vec<RaceCard> {
    let document = Html::parse_document(html);
    card_elements(&document)
        .into_iter()
        .map(|el| parse_card(&el))
        .collect()
}

/// Top-level `div.race` elements in document order (nested cards excluded).
pub fn card_elements(document: &Html) -> Vec<ElementRef<'_>> {
    let Ok(sel) = selector(CARD_SELECTOR) else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter(|el| !el.ancestors().filter_map(ElementRef::wrap).any(|a| is_card(&a)))
        .collect()
}

fn is_card(el: &ElementRef<'_>) -> bool {
    el.value().name() == "div" && el.value().classes().any(|c| c == "race")
}

fn parse_card(card: &ElementRef<'_>) -> RaceCard {
    let first_text = |css: &str| -> Option<String> {
        let sel = selector(css).ok()?;
        card.select(&sel).next().map(|el| element_text(&el))
    };

    let race_name = first_text("h1").unwrap_or_default().trim().to_string();
    let race_date = first_text("h2").map(|d| d.trim().to_string());
    let source = parse_attribution(card);

    let mut banner = None;
    let mut body = String::new();
    if let Some(pre) = selector("pre")
        .ok()
        .and_then(|sel| card.select(&sel).next())
    {
        for child in pre.children() {
            match child.value() {
                Node::Text(t) => body.push_str(t),
                Node::Element(el) if el.name() == "b" && banner.is_none() => {
                    if let Some(b) = ElementRef::wrap(child) {
                        banner = Some(element_text(&b));
                    }
                }
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        body.push_str(&element_text(&el));
                    }
                }
                _ => {}
            }
        }
    }

    let body = if banner.is_some() {
        body.strip_prefix('\n').unwrap_or(&body).to_string()
    } else {
        body
    };
    let lines = if body.is_empty() {
        Vec::new()
    } else {
        body.split('\n').map(str::to_string).collect()
    };

    RaceCard {
        race_name,
        race_date,
        source,
        banner,
        lines,
    }
}

fn parse_attribution(card: &ElementRef<'_>) -> Option<Attribution> {
    let sel = selector("p").ok()?;
    let p = card.select(&sel).next()?;
    let link_sel = selector("a[href]").ok()?;
    let url = p.select(&link_sel).next()?.value().attr("href")?.to_string();

    let label = element_text(&p);
    let label = label
        .split_once(" on ")
        .map(|(_, rest)| rest.trim().trim_end_matches('.').to_string())
        .unwrap_or_default();

    Some(Attribution { label, url })
}
