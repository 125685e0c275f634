//! Month archive pages, scanned only on backfill runs.
//!
//! Archive pages are HTML listings. Every announcement anchor becomes a
//! feature dated the first instant of the month it was listed under.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use lagtrack::backfill::{ArchiveMonth, BackfillPlan};
use lagtrack::config::CloudProfile;
use lagtrack::model::{Cloud, FeatureRecord};
use lagtrack::normalize::Normalizer;

use super::common::FetchClient;
use super::feed::{clean_title, extract_service};

fn anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#).expect("static regex")
    })
}

/// A link on an archive page.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveLink {
    pub title: String,
    pub href: String,
}

/// Path fragment an announcement link must contain, if the template has one.
fn month_path(template: &str, month: ArchiveMonth) -> Option<String> {
    if !template.contains("whats-new/{year}/{month}") {
        return None;
    }
    Some(month.render("whats-new/{year}/{month}/"))
}

fn absolutize(href: &str, page_url: &str) -> String {
    url::Url::parse(page_url)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Extract announcement links from one archive page.
///
/// With a `whats-new/<year>/<month>` template only links below that path
/// (and not the listing page itself) count. Otherwise every titled anchor does.
pub fn extract_links(html: &str, page_url: &str, path_filter: Option<&str>) -> Vec<ArchiveLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for caps in anchor_re().captures_iter(html) {
        let raw_href = &caps[1];
        if let Some(fragment) = path_filter {
            let Some(pos) = raw_href.find(fragment) else {
                continue;
            };
            let slug = raw_href[pos + fragment.len()..].trim_matches('/');
            if slug.is_empty() {
                continue;
            }
        }

        let decoded = quick_xml::escape::unescape(&caps[2])
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| caps[2].to_string());
        let title = clean_title(&decoded);
        if title.is_empty() || !seen.insert(title.clone()) {
            continue;
        }

        links.push(ArchiveLink {
            title,
            href: absolutize(raw_href, page_url),
        });
    }

    links
}

/// Scans a cloud's month archives for a backfill plan.
pub(crate) struct ArchiveScanner {
    client: FetchClient,
}

impl ArchiveScanner {
    pub(crate) fn new(client: FetchClient) -> Self {
        Self { client }
    }

    /// Records for every month in the plan. A month that cannot be fetched
    /// is skipped; the rest of the scan carries on.
    pub(crate) fn scan(
        &self,
        cloud: Cloud,
        profile: &CloudProfile,
        normalizer: &Normalizer,
        plan: &BackfillPlan,
    ) -> Vec<FeatureRecord> {
        let Some(template) = profile.archive_url.as_deref() else {
            tracing::debug!(%cloud, "no archive_url; skipping backfill");
            return Vec::new();
        };

        let mut out = Vec::new();
        for &month in &plan.months {
            let url = month.render(template);
            let html = match self.client.request_with_retry_text(|http| http.get(url.as_str())) {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(%cloud, %url, error = %e, "archive month skipped");
                    continue;
                }
            };

            let filter = month_path(template, month);
            let links = extract_links(&html, &url, filter.as_deref());
            tracing::debug!(%cloud, %url, links = links.len(), "archive month read");

            let at = month.first_instant();
            out.extend(links.into_iter().map(|link| {
                let service = extract_service(&link.title, cloud, &profile.brand_prefixes, normalizer);
                FeatureRecord::new(cloud, service, link.title, at, link.href)
            }));
        }

        tracing::info!(%cloud, months = plan.months.len(), records = out.len(), "archive scan finished");
        out
    }
}
