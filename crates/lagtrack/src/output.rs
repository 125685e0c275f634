//! The persisted projection of a reconciled feature.
//!
//! Field names and value shapes are the on-disk contract read by the
//! dashboard. `status` is `"Supported"` or `"Not Supported"`, `date` is
//! `YYYY-MM-DD`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::DisplayConfig;
use crate::model::{Cloud, FeatureRecord, SupportStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub id: String,
    pub cloud: Cloud,
    pub service: String,
    pub feature: String,
    pub link: String,
    pub status: SupportStatus,
    pub version: String,
    pub lag: u32,
    pub date: NaiveDate,
}

/// `<cloud>-<slice>`: the first `title_chars` characters of the title,
/// lower-cased, with every non-alphanumeric character turned into `-`.
///
/// Distinct titles sharing a prefix produce the same id. Dedup is keyed on
/// the title, so a collision only affects consumers that key on `id`.
pub fn derive_id(cloud: Cloud, feature: &str, title_chars: usize) -> String {
    let slice: String = feature
        .chars()
        .take(title_chars)
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!("{}-{}", cloud, slice)
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

impl FeatureRecord {
    pub fn to_output(&self, display: &DisplayConfig) -> OutputRecord {
        OutputRecord {
            id: derive_id(self.cloud, &self.feature, display.id_title_chars),
            cloud: self.cloud,
            service: truncate_chars(&self.service, display.service_max_chars),
            feature: self.feature.clone(),
            link: self.link.clone(),
            status: self.support_status,
            version: self.matched_version.clone(),
            lag: self.lag_days,
            date: self.announced_at.date_naive(),
        }
    }
}

impl OutputRecord {
    pub fn is_supported(&self) -> bool {
        self.status == SupportStatus::Supported
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn id_is_sanitized_prefix() {
        assert_eq!(
            derive_id(Cloud::Aws, "Amazon EKS: IPv6 support", 15),
            "aws-amazon-eks--ipv"
        );
    }

    #[test]
    fn id_handles_short_and_multibyte_titles() {
        assert_eq!(derive_id(Cloud::Gcp, "GKE", 15), "gcp-gke");
        assert_eq!(derive_id(Cloud::Azure, "Café Ünïcode", 6), "azure-caf---");
    }

    #[test]
    fn colliding_titles_share_an_id() {
        let a = derive_id(Cloud::Aws, "Amazon Bedrock adds model A", 15);
        let b = derive_id(Cloud::Aws, "Amazon Bedrock adds model B", 15);
        assert_eq!(a, b);
    }

    #[test]
    fn projection_truncates_service_and_formats_date() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 0).unwrap();
        let mut f = FeatureRecord::new(
            Cloud::Aws,
            "A Really Long Service Label That Keeps Going",
            "Amazon Widget Service now supports X",
            at,
            "https://aws.example/x",
        );
        f.support_status = SupportStatus::Supported;
        f.matched_version = "v5.0.0".into();
        f.lag_days = 9;

        let out = f.to_output(&DisplayConfig::default());
        assert_eq!(out.service.chars().count(), 25);
        assert_eq!(out.version, "v5.0.0");
        assert_eq!(out.lag, 9);

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["status"], "Supported");
        assert_eq!(json["cloud"], "aws");
        assert_eq!(json["id"], "aws-amazon-widget-s");
    }

    #[test]
    fn reads_legacy_document() {
        let json = r#"{
            "id": "aws-amazon-q-busine",
            "cloud": "aws",
            "service": "Q",
            "feature": "Amazon Q Business adds connectors",
            "link": "https://aws.example/q",
            "status": "Not Supported",
            "version": "none",
            "lag": 42,
            "date": "2024-02-03",
            "extra": true
        }"#;
        let rec: OutputRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.status, SupportStatus::NotSupported);
        assert_eq!(rec.date, NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
    }
}
