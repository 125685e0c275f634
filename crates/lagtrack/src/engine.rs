use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::config::{CloudProfile, MatchPolicy, TrackerConfig};
use crate::matcher::{first_acceptable, resource_guess};
use crate::model::{Cloud, FeatureRecord, ReleaseRecord, SupportStatus, VERSION_NONE};
use crate::normalize::Normalizer;
use crate::tokenize::{stop_word_set, tokenize};

/// Everything one cloud's reconciliation pass needs, passed explicitly.
pub struct ReconcileContext<'a> {
    pub profile: &'a CloudProfile,
    pub policy: &'a MatchPolicy,
    pub normalizer: &'a Normalizer,
    /// Reference instant for the age of unmatched features.
    pub now: DateTime<Utc>,
}

/// Reconcile one cloud's features against that cloud's releases.
///
/// Releases are sorted by publish date on every call, so the caller may
/// reuse the same slice across batches in any order.
pub fn reconcile(
    features: Vec<FeatureRecord>,
    releases: &[ReleaseRecord],
    ctx: &ReconcileContext<'_>,
) -> Vec<FeatureRecord> {
    let mut sorted: Vec<&ReleaseRecord> = releases.iter().collect();
    sorted.sort_by_key(|r| r.published_at);

    if sorted.is_empty() && !features.is_empty() {
        tracing::warn!(
            features = features.len(),
            "no release data; every feature stays pending"
        );
    }

    let stop_words = stop_word_set([
        ctx.profile.stop_words.as_slice(),
        ctx.policy.common_stop_words.as_slice(),
    ]);

    features
        .into_iter()
        .map(|mut feature| {
            // First release published at or after the announcement.
            let start = sorted.partition_point(|r| r.published_at < feature.announced_at);
            let candidates = sorted[start..].iter().copied();

            let tokens = tokenize(&feature.feature, &stop_words);
            let service_token = ctx.normalizer.normalize(&feature.service, feature.cloud);
            let guess = resource_guess(&ctx.profile.resource_prefix, &service_token);

            match first_acceptable(&tokens, &service_token, &guess, candidates, ctx.policy) {
                Some(hit) => {
                    tracing::debug!(
                        feature = %feature.feature,
                        version = %hit.release.version,
                        score = hit.score,
                        anchor = ?hit.anchor,
                        "matched"
                    );
                    let lag = (hit.release.published_at - feature.announced_at).num_days();
                    feature.support_status = SupportStatus::Supported;
                    feature.matched_version = hit.release.version.clone();
                    feature.lag_days = clamp_days(lag);
                }
                None => mark_pending(&mut feature, ctx.now),
            }
            feature
        })
        .collect()
}

/// Reconcile a mixed batch. Each feature is matched only against the
/// releases of its own cloud; a cloud with no configured profile or no
/// releases leaves its features pending.
pub fn reconcile_all(
    features: Vec<FeatureRecord>,
    releases: &BTreeMap<Cloud, Vec<ReleaseRecord>>,
    config: &TrackerConfig,
    now: DateTime<Utc>,
) -> Vec<FeatureRecord> {
    let normalizer = config.normalizer();

    let mut by_cloud: BTreeMap<Cloud, Vec<FeatureRecord>> = BTreeMap::new();
    for f in features {
        by_cloud.entry(f.cloud).or_default().push(f);
    }

    let mut out = Vec::new();
    for (cloud, group) in by_cloud {
        let Some(profile) = config.clouds.get(cloud) else {
            tracing::warn!(%cloud, "cloud not configured; features left pending");
            out.extend(group.into_iter().map(|mut f| {
                mark_pending(&mut f, now);
                f
            }));
            continue;
        };

        let ctx = ReconcileContext {
            profile,
            policy: &config.matching,
            normalizer: &normalizer,
            now,
        };
        let cloud_releases = releases.get(&cloud).map(Vec::as_slice).unwrap_or(&[]);
        let _span = tracing::info_span!("reconcile", %cloud).entered();
        let reconciled = reconcile(group, cloud_releases, &ctx);
        let matched = reconciled.iter().filter(|f| f.is_supported()).count();
        tracing::info!(features = reconciled.len(), matched, releases = cloud_releases.len(), "cloud reconciled");
        out.extend(reconciled);
    }
    out
}

fn mark_pending(feature: &mut FeatureRecord, now: DateTime<Utc>) {
    feature.support_status = SupportStatus::NotSupported;
    feature.matched_version = VERSION_NONE.to_string();
    feature.lag_days = clamp_days((now - feature.announced_at).num_days());
}

fn clamp_days(days: i64) -> u32 {
    days.clamp(0, u32::MAX as i64) as u32
}
