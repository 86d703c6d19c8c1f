//! Scraper for turniere.discgolf.de
//!
//! Index page: one summary row per tournament. The detail page
//! (`&sp=view&id=<id>`) lists the registration phases of a single
//! tournament.

pub mod dates;
pub mod parser;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::DateTime;
use chrono_tz::Tz;

pub use parser::{parse_index, parse_phases};

/// Tournament index URL; the detail pages share the base, see [`detail_url`].
pub const BASE_URL: &str = "https://turniere.discgolf.de/index.php?p=events";

/// One tournament summary row from the index page.
#[derive(Debug, Clone, PartialEq)]
pub struct Tournament {
    /// Stable site id, taken from the `id` query parameter of [`Self::link`].
    pub id: String,
    pub title: String,
    /// Detail page URL as printed on the index page (usually relative).
    pub link: String,
    pub location: String,
    /// First tournament day, day granularity.
    pub tournament_date: Option<DateTime<Tz>>,
    /// Advertised registration opening, minute granularity. `None` means the
    /// index row shows no registration phase.
    pub registration_start_date: Option<DateTime<Tz>>,
    /// Up to four series tags; the "Info" pseudo tag is dropped.
    pub series: Vec<String>,
    /// The site's "Letzte Änderung" marker; epoch when the cell is missing.
    pub changed: DateTime<Tz>,
    /// Registration phases from the detail page, replaced on each re-fetch.
    pub phases: Vec<Phase>,
}

/// One registration phase row from a detail page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Phase {
    pub title: String,
    pub registration_start_date: Option<DateTime<Tz>>,
    /// Extra phase columns (rating caps, membership requirements, ...)
    /// keyed by their column header.
    pub requirements: HashMap<String, String>,
}

/// Absolute detail page URL for a tournament id.
pub fn detail_url(id: &str) -> String {
    format!("{BASE_URL}&sp=view&id={id}")
}

/// HTTP client for the tournament site. Plain unauthenticated GETs; any
/// non-2xx status is an error.
pub struct TurnierClient {
    client: reqwest::Client,
}

impl TurnierClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    pub async fn fetch_index(&self) -> Result<String> {
        self.get(BASE_URL).await
    }

    pub async fn fetch_details(&self, id: &str) -> Result<String> {
        self.get(&detail_url(id)).await
    }

    async fn get(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request failed for {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("turniere.discgolf.de HTTP {status} for {url}"));
        }
        Ok(resp.text().await?)
    }
}

impl Default for TurnierClient {
    fn default() -> Self {
        Self::new()
    }
}
