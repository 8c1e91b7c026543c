// src/services/report.rs

//! Report aggregation.
//!
//! The output is a single HTML document whose body holds one `div.race`
//! card per race, after whatever the body already contained. Cards are appended with read-modify-write semantics, so a
//! report path must only be written by one process at a time.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use scraper::Html;
use tempfile::NamedTempFile;

use crate::error::Result;
use crate::services::render::card_elements;
use crate::utils::selector;

/// An HTML results document on disk.
#[derive(Debug, Clone)]
pub struct Report {
    path: PathBuf,
    stylesheet: String,
}

/// Parsed document pieces: head elements and body markup.
struct Parts {
    head: Vec<String>,
    body: Vec<String>,
}

impl Report {
    /// Create a report writer for the given path.
    pub fn new(path: impl Into<PathBuf>, stylesheet: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stylesheet: stylesheet.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stylesheet(&self) -> &str {
        &self.stylesheet
    }

    /// Create the document shell if the file is missing or empty.
    ///
    /// An existing document is left untouched so later cards are appended to it.
    pub fn initialize(&self) -> Result<()> {
        let has_content = fs::metadata(&self.path)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if has_content {
            log::debug!("Appending to existing report {}", self.path.display());
            return Ok(());
        }
        let head = vec![self.stylesheet_link()];
        self.write(&head, &[])
    }

    /// Append one card fragment as a new top-level block.
    pub fn append(&self, fragment: &str) -> Result<()> {
        let mut parts = self.read()?;
        parts.body.push(fragment.trim().to_string());
        self.write(&parts.head, &parts.body)
    }

    /// Card fragments currently in the document, in order.
    pub fn cards(&self) -> Result<Vec<String>> {
        let document = Html::parse_document(&self.content()?);
        Ok(card_elements(&document).into_iter().map(|el| el.html()).collect())
    }

    /// Append the cards of each partial document, in the order given.
    ///
    /// Returns the number of cards merged. Missing partials contribute nothing.
    pub fn merge<P: AsRef<Path>>(&self, partials: &[P]) -> Result<usize> {
        self.initialize()?;
        let mut parts = self.read()?;
        let mut merged = 0;

        for partial in partials {
            let partial = partial.as_ref();
            let content = match fs::read_to_string(partial) {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let document = Html::parse_document(&content);
            let cards = card_elements(&document);
            log::debug!("Merging {} cards from {}", cards.len(), partial.display());
            merged += cards.len();
            parts.body.extend(cards.into_iter().map(|el| el.html()));
        }

        self.write(&parts.head, &parts.body)?;
        Ok(merged)
    }

    fn content(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn read(&self) -> Result<Parts> {
        let mut parts = split_document(&self.content()?);
        if parts.head.is_empty() {
            parts.head.push(self.stylesheet_link());
        }
        Ok(parts)
    }

    /// Write the document pretty-printed, replacing the file atomically.
    fn write(&self, head: &[String], body: &[String]) -> Result<()> {
        let mut html = String::from("<html>\n<head>\n");
        for element in head {
            html.push_str(element);
            html.push('\n');
        }
        html.push_str("</head>\n<body>\n");
        for block in body {
            html.push_str(block);
            html.push('\n');
        }
        html.push_str("</body>\n</html>\n");

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(html.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn stylesheet_link(&self) -> String {
        format!(
            "<link rel=\"stylesheet\" href=\"{}\" type=\"text/css\">",
            crate::utils::text::escape_html(&self.stylesheet)
        )
    }
}

fn split_document(content: &str) -> Parts {
    let document = Html::parse_document(content);
    let head = selector("head > *")
        .map(|sel| document.select(&sel).map(|el| el.html()).collect())
        .unwrap_or_default();
    // Everything already in the body is kept as-is, cards or not.
    let mut body = Vec::new();
    if let Ok(sel) = selector("body") {
        if let Some(el) = document.select(&sel).next() {
            let markup = el.inner_html();
            if !markup.trim().is_empty() {
                body.push(markup.trim().to_string());
            }
        }
    }
    Parts { head, body }
}
