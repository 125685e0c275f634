//! One tracker run: config → store → backfill decision → acquisition →
//! reconciliation → merge → store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use lagtrack::backfill;
use lagtrack::engine::reconcile_all;
use lagtrack::model::Cloud;
use lagtrack::output::OutputRecord;
use lagtrack::summary::{summarize, ReconcileSummary};
use lagtrack::{merge, TrackerConfig};

use crate::exit_codes::{EXIT_CONFIG_INVALID, EXIT_NO_DATA, EXIT_STORE_WRITE};
use crate::fetch::{acquire_all, AcquireOptions};
use crate::store;
use crate::CliError;

pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub no_backfill: bool,
    /// Clouds to process; empty means every configured cloud.
    pub clouds: Vec<Cloud>,
    pub acquire: AcquireOptions,
}

/// Per-cloud acquisition counts for the run report.
#[derive(Debug, Default, Serialize)]
pub struct SourceReport {
    pub features: usize,
    pub releases: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// What a run did. Printed with `--json`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub output: String,
    pub previous_records: usize,
    pub backfill: bool,
    pub sources: BTreeMap<Cloud, SourceReport>,
    pub summary: ReconcileSummary,
}

/// Read and validate the config at `path`, or the built-in one.
pub fn load_config(path: Option<&Path>) -> Result<TrackerConfig, CliError> {
    let result = match path {
        Some(p) => {
            let text = fs::read_to_string(p).map_err(|e| CliError {
                code: EXIT_CONFIG_INVALID,
                message: format!("cannot read config {}: {}", p.display(), e),
                hint: None,
            })?;
            TrackerConfig::from_toml(&text)
        }
        None => TrackerConfig::builtin(),
    };

    result.map_err(|e| CliError {
        code: EXIT_CONFIG_INVALID,
        message: e.to_string(),
        hint: path.map(|p| format!("fix {} or omit --config to use the built-in defaults", p.display())),
    })
}

/// Narrow `config` to the clouds picked on the command line.
pub fn select_clouds(config: &mut TrackerConfig, clouds: &[Cloud]) -> Result<(), CliError> {
    if clouds.is_empty() {
        return Ok(());
    }
    config.clouds.retain(clouds);
    if config.clouds.is_empty() {
        let picked: Vec<&str> = clouds.iter().map(Cloud::as_str).collect();
        return Err(CliError {
            code: EXIT_CONFIG_INVALID,
            message: format!("none of the selected clouds ({}) is configured", picked.join(", ")),
            hint: Some("add a [clouds.<name>] table or drop --cloud".into()),
        });
    }
    Ok(())
}

pub fn run(args: &RunArgs, now: DateTime<Utc>) -> Result<RunReport, CliError> {
    let mut config = load_config(args.config.as_deref())?;
    select_clouds(&mut config, &args.clouds)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output));

    let existing = store::load(&output);
    let previous_records = existing.len();

    let plan = if args.no_backfill {
        None
    } else {
        backfill::plan(&config.backfill, previous_records, now)
    };
    if let Some(ref p) = plan {
        tracing::info!(
            previous_records,
            low_water_mark = config.backfill.low_water_mark,
            months = p.months.len(),
            "store below low-water mark; scanning archives"
        );
    }

    let harvests = acquire_all(&config, plan.as_ref(), &args.acquire, now);

    let mut sources = BTreeMap::new();
    let mut features = Vec::new();
    let mut releases = BTreeMap::new();
    for (cloud, harvest) in harvests {
        sources.insert(
            cloud,
            SourceReport {
                features: harvest.features.len(),
                releases: harvest.releases.len(),
                errors: harvest.errors,
            },
        );
        features.extend(harvest.features);
        releases.insert(cloud, harvest.releases);
    }

    if features.is_empty() {
        let detail: Vec<String> = sources
            .iter()
            .flat_map(|(cloud, s)| s.errors.iter().map(move |e| format!("{cloud}: {e}")))
            .collect();
        return Err(CliError {
            code: EXIT_NO_DATA,
            message: format!(
                "no feature records acquired from any cloud; {} left untouched",
                output.display()
            ),
            hint: (!detail.is_empty()).then(|| detail.join("\n")),
        });
    }

    let reconciled = reconcile_all(features, &releases, &config, now);
    let fresh: Vec<OutputRecord> = reconciled.iter().map(|f| f.to_output(&config.display)).collect();
    let merged = merge(existing, fresh);

    store::save(&output, &merged).map_err(|e| CliError {
        code: EXIT_STORE_WRITE,
        message: format!("cannot write {}: {}", output.display(), e),
        hint: None,
    })?;

    let summary = summarize(&merged);
    tracing::info!(
        total = summary.total,
        supported = summary.supported,
        not_supported = summary.not_supported,
        median_lag = ?summary.median_lag_supported,
        "run complete"
    );

    Ok(RunReport {
        output: output.display().to_string(),
        previous_records,
        backfill: plan.is_some(),
        sources,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_loads() {
        let config = load_config(None).unwrap();
        assert_eq!(config.clouds.len(), 3);
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert_eq!(err.code, EXIT_CONFIG_INVALID);
    }

    #[test]
    fn cloud_selection_narrows_config() {
        let mut config = load_config(None).unwrap();
        select_clouds(&mut config, &[Cloud::Azure]).unwrap();
        let left: Vec<Cloud> = config.clouds.iter().map(|(c, _)| c).collect();
        assert_eq!(left, vec![Cloud::Azure]);
    }

    #[test]
    fn empty_selection_keeps_everything() {
        let mut config = load_config(None).unwrap();
        select_clouds(&mut config, &[]).unwrap();
        assert_eq!(config.clouds.len(), 3);
    }

    #[test]
    fn selecting_only_unconfigured_clouds_is_config_error() {
        let mut config = load_config(None).unwrap();
        config.clouds.retain(&[Cloud::Aws]);
        let err = select_clouds(&mut config, &[Cloud::Gcp]).unwrap_err();
        assert_eq!(err.code, EXIT_CONFIG_INVALID);
        assert!(err.message.contains("gcp"));
    }

    #[test]
    fn invalid_config_carries_hint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[matching]\nresource_threshold = 1.5\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert_eq!(err.code, EXIT_CONFIG_INVALID);
        assert!(err.hint.unwrap().contains("bad.toml"));
    }
}
