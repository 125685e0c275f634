use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::TrackerError;
use crate::model::Cloud;
use crate::normalize::{builtin_synonyms, Normalizer};

const BUILTIN_TOML: &str = include_str!("default_config.toml");

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default)]
    pub backfill: BackfillConfig,
    #[serde(default)]
    pub matching: MatchPolicy,
    #[serde(default)]
    pub display: DisplayConfig,
    /// Extra alias → token entries layered over the built-in table.
    #[serde(default)]
    pub synonyms: BTreeMap<String, String>,
    pub clouds: CloudsConfig,
}

fn default_output() -> String {
    "lag_data.json".into()
}

// ---------------------------------------------------------------------------
// Backfill
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BackfillConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Persisted record count below which a bootstrap scan runs.
    #[serde(default = "default_low_water_mark")]
    pub low_water_mark: usize,
    /// Months of archive to scan, current month included.
    #[serde(default = "default_backfill_months")]
    pub months: u32,
}

fn default_true() -> bool {
    true
}

fn default_low_water_mark() -> usize {
    100
}

fn default_backfill_months() -> u32 {
    12
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            low_water_mark: default_low_water_mark(),
            months: default_backfill_months(),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Acceptance thresholds, one per anchor tier, plus the stop words every
/// cloud shares.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchPolicy {
    #[serde(default = "default_resource_threshold")]
    pub resource_threshold: f64,
    #[serde(default = "default_service_threshold")]
    pub service_threshold: f64,
    #[serde(default = "default_base_threshold")]
    pub base_threshold: f64,
    #[serde(default = "default_common_stop_words")]
    pub common_stop_words: Vec<String>,
}

fn default_resource_threshold() -> f64 {
    0.20
}

fn default_service_threshold() -> f64 {
    0.25
}

fn default_base_threshold() -> f64 {
    0.30
}

/// Announcement boilerplate that says nothing about what shipped.
const COMMON_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "at", "by", "for", "from", "in", "is", "new", "now",
    "of", "on", "the", "to", "via", "with", "you", "your",
    "available", "availability", "general", "generally", "introducing", "announcing",
    "supports", "support", "launches",
];

fn default_common_stop_words() -> Vec<String> {
    COMMON_STOP_WORDS.iter().map(|w| w.to_string()).collect()
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            resource_threshold: default_resource_threshold(),
            service_threshold: default_service_threshold(),
            base_threshold: default_base_threshold(),
            common_stop_words: default_common_stop_words(),
        }
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_service_max_chars")]
    pub service_max_chars: usize,
    #[serde(default = "default_id_title_chars")]
    pub id_title_chars: usize,
}

fn default_service_max_chars() -> usize {
    25
}

fn default_id_title_chars() -> usize {
    15
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            service_max_chars: default_service_max_chars(),
            id_title_chars: default_id_title_chars(),
        }
    }
}

// ---------------------------------------------------------------------------
// Clouds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudsConfig {
    #[serde(default)]
    pub aws: Option<CloudProfile>,
    #[serde(default)]
    pub azure: Option<CloudProfile>,
    #[serde(default)]
    pub gcp: Option<CloudProfile>,
}

impl CloudsConfig {
    pub fn get(&self, cloud: Cloud) -> Option<&CloudProfile> {
        match cloud {
            Cloud::Aws => self.aws.as_ref(),
            Cloud::Azure => self.azure.as_ref(),
            Cloud::Gcp => self.gcp.as_ref(),
        }
    }

    /// Configured clouds in fixed aws, azure, gcp order.
    pub fn iter(&self) -> impl Iterator<Item = (Cloud, &CloudProfile)> {
        Cloud::ALL
            .into_iter()
            .filter_map(move |cloud| self.get(cloud).map(|p| (cloud, p)))
    }

    /// Drop every profile whose cloud is not in `keep`.
    pub fn retain(&mut self, keep: &[Cloud]) {
        for cloud in Cloud::ALL {
            if keep.contains(&cloud) {
                continue;
            }
            match cloud {
                Cloud::Aws => self.aws = None,
                Cloud::Azure => self.azure = None,
                Cloud::Gcp => self.gcp = None,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything the tracker knows about one cloud: where its announcements
/// come from, which provider repository tracks it, and how its resources
/// are named.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudProfile {
    /// Announcement feeds, tried in order until one yields items.
    pub feeds: Vec<String>,
    /// Month archive template with `{year}` and `{month}` placeholders.
    #[serde(default)]
    pub archive_url: Option<String>,
    /// `owner/name` of the provider repository on GitHub.
    pub release_repo: String,
    pub resource_prefix: String,
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default)]
    pub brand_prefixes: Vec<String>,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_release_pages")]
    pub release_pages: u32,
    /// Aliases that only apply to this cloud's labels.
    #[serde(default)]
    pub synonyms: BTreeMap<String, String>,
}

fn default_max_items() -> usize {
    30
}

fn default_release_pages() -> u32 {
    3
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl TrackerConfig {
    pub fn from_toml(input: &str) -> Result<Self, TrackerError> {
        let config: TrackerConfig =
            toml::from_str(input).map_err(|e| TrackerError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The configuration shipped with the crate.
    pub fn builtin() -> Result<Self, TrackerError> {
        Self::from_toml(BUILTIN_TOML)
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.clouds.is_empty() {
            return Err(TrackerError::ConfigValidation(
                "at least one cloud must be configured".into(),
            ));
        }

        let m = &self.matching;
        for (name, value) in [
            ("resource_threshold", m.resource_threshold),
            ("service_threshold", m.service_threshold),
            ("base_threshold", m.base_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrackerError::ConfigValidation(format!(
                    "matching.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if m.resource_threshold > m.service_threshold || m.service_threshold > m.base_threshold {
            return Err(TrackerError::ConfigValidation(
                "thresholds must be ordered resource <= service <= base".into(),
            ));
        }

        if self.display.service_max_chars == 0 || self.display.id_title_chars == 0 {
            return Err(TrackerError::ConfigValidation(
                "display limits must be greater than zero".into(),
            ));
        }

        for (cloud, profile) in self.clouds.iter() {
            if profile.feeds.iter().all(|f| f.trim().is_empty()) {
                return Err(TrackerError::ConfigValidation(format!(
                    "cloud '{cloud}': at least one feed URL is required"
                )));
            }
            let repo_ok = profile
                .release_repo
                .split_once('/')
                .map(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'))
                .unwrap_or(false);
            if !repo_ok {
                return Err(TrackerError::ConfigValidation(format!(
                    "cloud '{cloud}': release_repo must be 'owner/name', got '{}'",
                    profile.release_repo
                )));
            }
            if let Some(ref template) = profile.archive_url {
                if !template.contains("{year}") || !template.contains("{month}") {
                    return Err(TrackerError::ConfigValidation(format!(
                        "cloud '{cloud}': archive_url must contain {{year}} and {{month}}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Built-in synonyms with this config's entries layered on top.
    ///
    /// Top-level `synonyms` apply to every cloud; a profile's own table
    /// only to that cloud and wins over both.
    pub fn normalizer(&self) -> Normalizer {
        let global = self
            .synonyms
            .iter()
            .map(|(a, t)| (None, a.clone(), t.clone()));
        let scoped = self.clouds.iter().flat_map(|(cloud, profile)| {
            profile
                .synonyms
                .iter()
                .map(move |(a, t)| (Some(cloud), a.clone(), t.clone()))
        });
        Normalizer::scoped(builtin_synonyms().chain(global).chain(scoped))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[clouds.aws]
feeds = ["https://example.test/feed"]
release_repo = "hashicorp/terraform-provider-aws"
resource_prefix = "aws_"
"#;

    #[test]
    fn builtin_parses() {
        let config = TrackerConfig::builtin().unwrap();
        assert_eq!(config.clouds.len(), 3);
        assert_eq!(config.backfill.low_water_mark, 100);
        assert_eq!(config.display.service_max_chars, 25);
        let aws = config.clouds.get(Cloud::Aws).unwrap();
        assert_eq!(aws.resource_prefix, "aws_");
        assert!(aws.archive_url.is_some());
        assert!(config.matching.common_stop_words.contains(&"now".to_string()));
    }

    #[test]
    fn minimal_uses_defaults() {
        let config = TrackerConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.output, "lag_data.json");
        assert_eq!(config.matching.resource_threshold, 0.20);
        assert_eq!(config.matching.service_threshold, 0.25);
        assert_eq!(config.matching.base_threshold, 0.30);
        assert_eq!(
            config.matching.common_stop_words,
            TrackerConfig::builtin().unwrap().matching.common_stop_words
        );
        assert!(config.backfill.enabled);
        assert_eq!(config.backfill.months, 12);
        let aws = config.clouds.get(Cloud::Aws).unwrap();
        assert_eq!(aws.max_items, 30);
        assert_eq!(aws.release_pages, 3);
        assert!(config.clouds.get(Cloud::Gcp).is_none());
        let order: Vec<_> = config.clouds.iter().map(|(c, _)| c).collect();
        assert_eq!(order, vec![Cloud::Aws]);
    }

    #[test]
    fn explicit_empty_stop_words_are_kept() {
        let input = format!("{MINIMAL}\n[matching]\ncommon_stop_words = []\n");
        let config = TrackerConfig::from_toml(&input).unwrap();
        assert!(config.matching.common_stop_words.is_empty());
        assert!(MatchPolicy::default().common_stop_words.contains(&"supports".to_string()));
    }

    #[test]
    fn synonyms_layer_over_builtin() {
        let input = format!("{MINIMAL}\n[synonyms]\n\"widget service\" = \"widget\"\n");
        let config = TrackerConfig::from_toml(&input).unwrap();
        let n = config.normalizer();
        assert_eq!(n.normalize("Widget Service", Cloud::Aws), "widget");
        assert_eq!(n.normalize("Widget Service", Cloud::Gcp), "widget");
        assert_eq!(n.normalize("Elastic Kubernetes Service", Cloud::Aws), "eks");
    }

    #[test]
    fn profile_synonyms_stay_in_their_cloud() {
        let input = format!(
            "{MINIMAL}\n[clouds.aws.synonyms]\n\"gadget\" = \"gizmo\"\n\n[clouds.gcp]\nfeeds = [\"https://example.test/gcp\"]\nrelease_repo = \"hashicorp/terraform-provider-google\"\nresource_prefix = \"google_\"\n"
        );
        let config = TrackerConfig::from_toml(&input).unwrap();
        let n = config.normalizer();
        assert_eq!(n.normalize("Gadget", Cloud::Aws), "gizmo");
        assert_eq!(n.normalize("Gadget", Cloud::Gcp), "gadget");
    }

    #[test]
    fn retain_keeps_selected_clouds() {
        let mut config = TrackerConfig::builtin().unwrap();
        config.clouds.retain(&[Cloud::Gcp, Cloud::Aws]);
        let left: Vec<Cloud> = config.clouds.iter().map(|(c, _)| c).collect();
        assert_eq!(left, vec![Cloud::Aws, Cloud::Gcp]);

        config.clouds.retain(&[Cloud::Azure]);
        assert!(config.clouds.is_empty());
    }

    #[test]
    fn reject_no_clouds() {
        let err = TrackerConfig::from_toml("[clouds]\n").unwrap_err();
        assert!(err.to_string().contains("at least one cloud"));
    }

    #[test]
    fn reject_threshold_out_of_range() {
        let input = format!("{MINIMAL}\n[matching]\nbase_threshold = 1.5\n");
        let err = TrackerConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("base_threshold"));
    }

    #[test]
    fn reject_unordered_thresholds() {
        let input = format!("{MINIMAL}\n[matching]\nresource_threshold = 0.5\n");
        let err = TrackerConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("ordered"));
    }

    #[test]
    fn reject_bad_repo() {
        let input = MINIMAL.replace("hashicorp/terraform-provider-aws", "terraform-provider-aws");
        let err = TrackerConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("owner/name"));
    }

    #[test]
    fn reject_archive_without_placeholders() {
        let input = format!("{MINIMAL}archive_url = \"https://example.test/archive\"\n");
        let err = TrackerConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("{year}"));
    }

    #[test]
    fn reject_empty_feeds() {
        let input = MINIMAL.replace("[\"https://example.test/feed\"]", "[]");
        let err = TrackerConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("feed URL"));
    }

    #[test]
    fn reject_malformed_toml() {
        let err = TrackerConfig::from_toml("clouds = [").unwrap_err();
        assert!(matches!(err, TrackerError::ConfigParse(_)));
    }
}
