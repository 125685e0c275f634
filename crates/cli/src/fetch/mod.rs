//! Acquisition: announcement feeds, month archives, and provider releases.
//!
//! Every cloud is acquired on its own scoped thread. Failures never cross
//! clouds and never abort the run: a cloud whose sources fail comes back
//! with empty lists and the error text for the run summary.

mod archive;
mod common;
mod feed;
mod github;

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};

use lagtrack::backfill::BackfillPlan;
use lagtrack::config::CloudProfile;
use lagtrack::model::{Cloud, FeatureRecord, ReleaseRecord};
use lagtrack::normalize::Normalizer;
use lagtrack::TrackerConfig;

use archive::ArchiveScanner;
use common::{FetchClient, FetchError};
use feed::FeedReader;
use github::GithubReleases;

pub use github::GITHUB_API_BASE;

/// Knobs that do not belong in the tracker config file.
#[derive(Debug, Clone)]
pub struct AcquireOptions {
    pub github_api: String,
    pub github_token: Option<String>,
    /// First retry delay for every HTTP source.
    pub backoff: Duration,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            github_api: GITHUB_API_BASE.to_string(),
            github_token: None,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Everything gathered for one cloud in one run.
#[derive(Debug, Default)]
pub struct CloudHarvest {
    pub features: Vec<FeatureRecord>,
    pub releases: Vec<ReleaseRecord>,
    pub errors: Vec<String>,
}

/// Acquire every configured cloud in parallel and join before returning.
pub fn acquire_all(
    config: &TrackerConfig,
    backfill: Option<&BackfillPlan>,
    opts: &AcquireOptions,
    now: DateTime<Utc>,
) -> BTreeMap<Cloud, CloudHarvest> {
    let normalizer = config.normalizer();

    thread::scope(|s| {
        let handles: Vec<_> = config
            .clouds
            .iter()
            .map(|(cloud, profile)| {
                let normalizer = &normalizer;
                (cloud, s.spawn(move || acquire_cloud(cloud, profile, normalizer, backfill, opts, now)))
            })
            .collect();

        handles
            .into_iter()
            .map(|(cloud, handle)| {
                let harvest = handle.join().unwrap_or_else(|_| {
                    tracing::error!(%cloud, "acquisition thread panicked");
                    CloudHarvest {
                        errors: vec!["acquisition thread panicked".to_string()],
                        ..CloudHarvest::default()
                    }
                });
                (cloud, harvest)
            })
            .collect()
    })
}

fn client(name: String, opts: &AcquireOptions) -> Result<FetchClient, FetchError> {
    Ok(FetchClient::new(&name)?.with_backoff(opts.backoff))
}

fn acquire_cloud(
    cloud: Cloud,
    profile: &CloudProfile,
    normalizer: &Normalizer,
    backfill: Option<&BackfillPlan>,
    opts: &AcquireOptions,
    now: DateTime<Utc>,
) -> CloudHarvest {
    let _span = tracing::info_span!("acquire", %cloud).entered();
    let mut harvest = CloudHarvest::default();

    if let Some(plan) = backfill {
        match client(format!("{cloud} archive"), opts) {
            Ok(c) => harvest
                .features
                .extend(ArchiveScanner::new(c).scan(cloud, profile, normalizer, plan)),
            Err(e) => harvest.errors.push(e.to_string()),
        }
    }

    let feed_result = client(format!("{cloud} feed"), opts)
        .and_then(|c| FeedReader::new(c).fetch_features(cloud, profile, normalizer, now));
    match feed_result {
        Ok(features) => harvest.features.extend(features),
        Err(e) => {
            tracing::warn!(error = %e, "announcement feeds unavailable");
            harvest.errors.push(e.to_string());
        }
    }

    let release_result = client(format!("{cloud} releases"), opts).and_then(|c| {
        GithubReleases::with_base_url(c, opts.github_api.clone(), opts.github_token.clone())
            .fetch(&profile.release_repo, profile.release_pages)
    });
    match release_result {
        Ok(releases) => harvest.releases = releases,
        Err(e) => {
            tracing::warn!(error = %e, "releases unavailable; features will stay pending");
            harvest.errors.push(e.to_string());
        }
    }

    harvest
}
