use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::MatchPolicy;
use crate::model::ReleaseRecord;

/// The strongest topical signal a release body carries for a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Body mentions the synthesized resource name (e.g. `aws_eks`).
    ResourceName,
    /// Body mentions the canonical service token (e.g. `eks`).
    ServiceToken,
    Unanchored,
}

impl Anchor {
    pub fn detect(body: &str, service_token: &str, resource_guess: &str) -> Self {
        // An empty token would make every body "contain" it.
        if service_token.is_empty() {
            return Self::Unanchored;
        }
        if body.contains(resource_guess) {
            Self::ResourceName
        } else if body.contains(service_token) {
            Self::ServiceToken
        } else {
            Self::Unanchored
        }
    }

    pub fn threshold(&self, policy: &MatchPolicy) -> f64 {
        match self {
            Self::ResourceName => policy.resource_threshold,
            Self::ServiceToken => policy.service_threshold,
            Self::Unanchored => policy.base_threshold,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchOutcome<'a> {
    pub release: &'a ReleaseRecord,
    pub score: f64,
    pub anchor: Anchor,
}

/// Fraction of title tokens that appear anywhere in `body` (substring test).
/// An empty token set scores 0.
pub fn overlap_score(tokens: &BTreeSet<String>, body: &str) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let hits = tokens.iter().filter(|t| body.contains(t.as_str())).count();
    hits as f64 / tokens.len() as f64
}

/// `<prefix><token>`, the resource type a provider would most likely add.
pub fn resource_guess(resource_prefix: &str, service_token: &str) -> String {
    format!("{resource_prefix}{service_token}")
}

/// Walk `candidates` in the given (chronological) order and return the first
/// release whose score clears the threshold for its anchor tier.
///
/// Earliest-sufficient wins: a later release with a higher score is never
/// preferred over an earlier one that already qualifies.
pub fn first_acceptable<'a, I>(
    tokens: &BTreeSet<String>,
    service_token: &str,
    resource_guess: &str,
    candidates: I,
    policy: &MatchPolicy,
) -> Option<MatchOutcome<'a>>
where
    I: IntoIterator<Item = &'a ReleaseRecord>,
{
    for release in candidates {
        let body = release.body_text.as_str();
        let score = overlap_score(tokens, body);
        let anchor = Anchor::detect(body, service_token, resource_guess);
        if score >= anchor.threshold(policy) {
            return Some(MatchOutcome { release, score, anchor });
        }
    }
    None
}
