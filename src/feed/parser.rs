//! Feed parsing for feedsync.
//!
//! `HttpFeedParser` fetches feeds over HTTP with `reqwest` and hands the
//! body to `feed-rs`, which understands RSS 0.9x/1.0/2.0, Atom and JSON
//! Feed.

use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;

use super::types::{ParsedFeed, ParsedItem};
use crate::config::FetcherConfig;
use crate::{FeedSyncError, Result};

/// Accept header sent with every feed request.
pub const FEED_ACCEPT: &str = "application/rss+xml,application/xml;q=0.9,text/xml;q=0.8,*/*;q=0.7";

/// Parses feeds from a URL or from raw content.
#[async_trait]
pub trait FeedParser: Send + Sync {
    /// Fetch the document at `url` and parse it.
    async fn parse_from_url(&self, url: &str) -> Result<ParsedFeed>;

    /// Parse a feed document that is already in memory.
    async fn parse_from_content(&self, raw: &str) -> Result<ParsedFeed>;
}

/// `FeedParser` that fetches over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeedParser {
    client: Client,
    max_feed_size: u64,
}

impl HttpFeedParser {
    /// Create a parser using the fetcher settings.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| FeedSyncError::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    /// Fetch the raw feed body.
    pub async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>> {
        validate_url(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedSyncError::Fetch(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FeedSyncError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            self.check_size(content_length)?;
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedSyncError::Fetch(format!("failed to read response: {}", e)))?;

        // Content-Length may be absent or wrong
        self.check_size(bytes.len() as u64)?;

        Ok(bytes.to_vec())
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_feed_size {
            return Err(FeedSyncError::Fetch(format!(
                "feed too large: {} bytes (max {} bytes)",
                size, self.max_feed_size
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedParser for HttpFeedParser {
    async fn parse_from_url(&self, url: &str) -> Result<ParsedFeed> {
        let bytes = self.fetch_raw(url).await?;
        parse_feed(&bytes)
    }

    async fn parse_from_content(&self, raw: &str) -> Result<ParsedFeed> {
        parse_feed(raw.as_bytes())
    }
}

/// Check that a URL is absolute http(s) with a host.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| FeedSyncError::Fetch(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FeedSyncError::Fetch(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(FeedSyncError::Fetch("URL has no host".to_string())),
    }
}

/// Parse feed bytes into a `ParsedFeed`.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let feed = parser::parse(bytes)
        .map_err(|e| FeedSyncError::Parse(format!("failed to parse feed: {}", e)))?;

    let title = feed
        .title
        .map(|t| t.content.trim().to_string())
        .unwrap_or_default();

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let summary = entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body))
                .map(|s| strip_html(&s))
                .filter(|s| !s.is_empty());

            ParsedItem {
                title: entry.title.map(|t| t.content),
                link: entry.links.into_iter().next().map(|l| l.href),
                summary,
            }
        })
        .collect();

    Ok(ParsedFeed { title, items })
}

/// Strip HTML tags, decode common entities and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '<' => {
                // Tags become a space so adjacent words stay apart
                for c in chars.by_ref() {
                    if c == '>' {
                        break;
                    }
                }
                text.push(' ');
            }
            '&' => {
                let mut entity = String::new();
                while let Some(&c) = chars.peek() {
                    if c == ';' || entity.len() > 10 || c.is_whitespace() || c == '&' {
                        break;
                    }
                    entity.push(c);
                    chars.next();
                }
                if chars.peek() == Some(&';') {
                    chars.next();
                    match decode_entity(&entity) {
                        Some(decoded) => text.push(decoded),
                        None => {
                            text.push('&');
                            text.push_str(&entity);
                            text.push(';');
                        }
                    }
                } else {
                    text.push('&');
                    text.push_str(&entity);
                }
            }
            _ => text.push(ch),
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
