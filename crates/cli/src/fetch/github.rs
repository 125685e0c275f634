//! Provider releases from the GitHub REST API.

use serde::Deserialize;

use lagtrack::model::ReleaseRecord;
use lagtrack::timestamp::{coerce_utc, parse_timestamp};

use super::common::{FetchClient, FetchError};

// ── Constants ───────────────────────────────────────────────────────

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const PAGE_LIMIT: usize = 100;

// ── Wire shape ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawRelease {
    tag_name: Option<String>,
    published_at: Option<String>,
    body: Option<String>,
}

impl RawRelease {
    /// Drafts have no `published_at`; those and garbled dates are skipped.
    fn into_record(self) -> Option<ReleaseRecord> {
        let published = self.published_at.as_deref().and_then(parse_timestamp)?;
        Some(ReleaseRecord::new(
            self.tag_name.as_deref(),
            coerce_utc(published),
            self.body.as_deref(),
        ))
    }
}

// ── Client ──────────────────────────────────────────────────────────

pub(crate) struct GithubReleases {
    client: FetchClient,
    base_url: String,
    token: Option<String>,
}

impl GithubReleases {
    pub(crate) fn with_base_url(client: FetchClient, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Newest-first releases of `repo` (`owner/name`), at most `max_pages`
    /// pages. A short page ends the walk early. A failure on the first page
    /// is an error; a later failure keeps the pages already read.
    pub(crate) fn fetch(&self, repo: &str, max_pages: u32) -> Result<Vec<ReleaseRecord>, FetchError> {
        let mut releases = Vec::new();
        let mut skipped = 0usize;

        for page in 1..=max_pages.max(1) {
            let items = match self.fetch_page(repo, page) {
                Ok(items) => items,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    tracing::warn!(repo, page, error = %e, kept = releases.len(), "release paging stopped early");
                    break;
                }
            };
            let count = items.len();

            for item in items {
                match item.into_record() {
                    Some(record) => releases.push(record),
                    None => skipped += 1,
                }
            }

            tracing::debug!(repo, page, count, "release page read");
            if count < PAGE_LIMIT {
                break;
            }
        }

        if skipped > 0 {
            tracing::warn!(repo, skipped, "releases without a usable published_at were skipped");
        }
        tracing::info!(repo, releases = releases.len(), "releases read");
        Ok(releases)
    }

    fn fetch_page(&self, repo: &str, page: u32) -> Result<Vec<RawRelease>, FetchError> {
        let url = format!("{}/repos/{}/releases", self.base_url, repo);
        let params = [("per_page", PAGE_LIMIT.to_string()), ("page", page.to_string())];
        let body = self.client.request_with_retry(|http| {
            let mut req = http
                .get(&url)
                .header("Accept", "application/vnd.github+json")
                .query(&params);
            if let Some(ref token) = self.token {
                req = req.bearer_auth(token);
            }
            req
        })?;

        serde_json::from_value(body).map_err(|e| FetchError::Parse {
            source_name: self.client.source_name().to_string(),
            message: format!("release page {page}: {e}"),
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────
