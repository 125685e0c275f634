use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::timestamp::{coerce_utc, RawTimestamp};

/// Version recorded on a feature that never matched a release.
pub const VERSION_NONE: &str = "none";

/// Version used when the upstream release carries no tag.
pub const VERSION_UNKNOWN: &str = "v0.0.0";

// ---------------------------------------------------------------------------
// Cloud
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cloud {
    Aws,
    Azure,
    Gcp,
}

impl Cloud {
    pub const ALL: [Cloud; 3] = [Cloud::Aws, Cloud::Azure, Cloud::Gcp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Gcp => "gcp",
        }
    }
}

impl std::fmt::Display for Cloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Cloud {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aws" => Ok(Self::Aws),
            "azure" => Ok(Self::Azure),
            "gcp" => Ok(Self::Gcp),
            other => Err(TrackerError::UnknownCloud(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Support status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SupportStatus {
    Supported,
    #[default]
    #[serde(rename = "Not Supported")]
    NotSupported,
}

impl std::fmt::Display for SupportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supported => write!(f, "Supported"),
            Self::NotSupported => write!(f, "Not Supported"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A provider-announced capability.
///
/// Created by an acquisition collaborator with the default status fields,
/// then filled in exactly once by [`crate::engine::reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub cloud: Cloud,
    pub service: String,
    /// Free-text title. Also the dedup key of the persisted dataset.
    pub feature: String,
    pub announced_at: DateTime<Utc>,
    pub link: String,
    pub support_status: SupportStatus,
    pub matched_version: String,
    pub lag_days: u32,
}

impl FeatureRecord {
    /// Build an unreconciled record. Naive timestamps are read as UTC.
    pub fn new(
        cloud: Cloud,
        service: impl Into<String>,
        feature: impl Into<String>,
        announced_at: impl Into<RawTimestamp>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            cloud,
            service: service.into(),
            feature: feature.into(),
            announced_at: coerce_utc(announced_at.into()),
            link: link.into(),
            support_status: SupportStatus::NotSupported,
            matched_version: VERSION_NONE.to_string(),
            lag_days: 0,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.support_status == SupportStatus::Supported
    }
}

/// A tagged provider release. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRecord {
    pub version: String,
    pub published_at: DateTime<Utc>,
    /// Lower-cased release notes.
    pub body_text: String,
}

impl ReleaseRecord {
    pub fn new(
        version: Option<&str>,
        published_at: impl Into<RawTimestamp>,
        body: Option<&str>,
    ) -> Self {
        let version = version
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(VERSION_UNKNOWN);
        Self {
            version: version.to_string(),
            published_at: coerce_utc(published_at.into()),
            body_text: body.unwrap_or_default().to_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn feature_defaults_to_unmatched() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let f = FeatureRecord::new(Cloud::Aws, "EKS", "Amazon EKS adds thing", at, "https://x");
        assert_eq!(f.support_status, SupportStatus::NotSupported);
        assert_eq!(f.matched_version, VERSION_NONE);
        assert_eq!(f.lag_days, 0);
    }

    #[test]
    fn naive_announcement_is_read_as_utc() {
        let naive = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        let f = FeatureRecord::new(Cloud::Gcp, "GKE", "t", naive, "");
        assert_eq!(f.announced_at, naive.and_utc());
    }

    #[test]
    fn release_defaults() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let r = ReleaseRecord::new(None, at, None);
        assert_eq!(r.version, VERSION_UNKNOWN);
        assert_eq!(r.body_text, "");

        let r = ReleaseRecord::new(Some("v5.1.0"), at, Some("Adds AWS_Widget"));
        assert_eq!(r.version, "v5.1.0");
        assert_eq!(r.body_text, "adds aws_widget");
    }

    #[test]
    fn cloud_round_trips_through_str() {
        for cloud in Cloud::ALL {
            assert_eq!(cloud.as_str().parse::<Cloud>().unwrap(), cloud);
        }
        assert!("oracle".parse::<Cloud>().is_err());
    }

    #[test]
    fn status_serializes_with_display_labels() {
        assert_eq!(
            serde_json::to_string(&SupportStatus::NotSupported).unwrap(),
            "\"Not Supported\""
        );
        assert_eq!(
            serde_json::to_string(&SupportStatus::Supported).unwrap(),
            "\"Supported\""
        );
    }
}
