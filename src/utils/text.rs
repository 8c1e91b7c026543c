// src/utils/text.rs

//! Text cleanup shared by extraction and rendering.

/// Normalize characters that sources encode inconsistently.
///
/// Non-breaking spaces become plain spaces, zero-width characters and byte
/// order marks are dropped, and `\r\n` / lone `\r` become `\n`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\u{a0}' | '\u{2007}' | '\u{202f}' => out.push(' '),
            '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}' => {}
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    out.push('\n');
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Strip trailing control characters (carriage returns, stray newlines).
pub fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(|c: char| c.is_control())
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Split text into lines, keeping document order and dropping line-end controls.
pub fn lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| trim_line_end(line).to_string())
        .collect()
}
