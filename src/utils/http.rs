// src/utils/http.rs

//! HTTP client utilities.

use std::io::Read;
use std::time::Duration;

use encoding_rs::WINDOWS_1252;
use flate2::read::GzDecoder;
use reqwest::blocking::{Client, RequestBuilder};

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Create a configured HTTP client.
///
/// Cookies are kept for the life of the client; some sites hand out a
/// session on the search page that the result page requires.
pub fn create_client(config: &HttpConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .cookie_store(true)
        .build()?;
    Ok(client)
}

/// Send a request and return the body, failing on non-2xx responses.
fn send(request: RequestBuilder, url: &str) -> Result<Vec<u8>> {
    let response = request
        .send()
        .map_err(|e| AppError::fetch(url, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::fetch(url, format!("HTTP status {status}")));
    }
    Ok(response.bytes()?.to_vec())
}

/// Fetch raw bytes, decompressing gzip payloads served without Content-Encoding.
pub fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    log::debug!("GET {}", url);
    let body = send(client.get(url), url)?;
    gunzip_if_needed(body)
}

/// Fetch a page as text.
pub fn fetch_text(client: &Client, url: &str) -> Result<String> {
    Ok(decode_text(&fetch_bytes(client, url)?))
}

/// Fetch a page with query parameters as text.
pub fn fetch_text_with_query(client: &Client, url: &str, query: &[(&str, &str)]) -> Result<String> {
    log::debug!("GET {} {:?}", url, query);
    let body = send(client.get(url).query(query), url)?;
    Ok(decode_text(&gunzip_if_needed(body)?))
}

/// POST a url-encoded form and return the response as text.
pub fn post_form(client: &Client, url: &str, form: &[(&str, &str)]) -> Result<String> {
    log::debug!("POST {}", url);
    let body = send(client.post(url).form(form), url)?;
    Ok(decode_text(&gunzip_if_needed(body)?))
}

/// Decompress the payload if it starts with the gzip magic number.
pub fn gunzip_if_needed(bytes: Vec<u8>) -> Result<Vec<u8>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes);
    }
    let mut decoded = Vec::new();
    GzDecoder::new(bytes.as_slice()).read_to_end(&mut decoded)?;
    Ok(decoded)
}

/// Decode as UTF-8, falling back to windows-1252 for legacy pages.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned(),
    }
}
