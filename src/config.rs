//! Pipeline settings loaded from a JSON or YAML document.
//!
//! ```yaml
//! sources:
//!   spending: raw/spending.csv
//!   places: raw/places.csv
//! bucket: travel-raw
//! object_store_root: /srv/objects
//! required_columns:
//!   spending: [Title, Date, Amount, In EUR]
//!   places: [Arrival_Date, Nights, City]
//! missing_data_threshold: 0.2
//! cleaned_outputs:
//!   spending: out/cleaned_spending.csv
//! missing_outputs:
//!   spending: out/missing_spending.csv
//! ```

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, ensure};
use serde::Deserialize;

use crate::{
    io_utils, kinds::TableKind, source::ReadOptions, validate::RequiredColumns,
    verify::ValidationOptions,
};

fn default_schema() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

fn default_null_tokens() -> Vec<String> {
    io_utils::DEFAULT_NULL_TOKENS
        .iter()
        .map(|t| t.to_string())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Table name to file path (local) or object key (bucket).
    pub sources: BTreeMap<String, String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub object_store_root: Option<PathBuf>,
    #[serde(default)]
    pub required_columns: RequiredColumns,
    pub missing_data_threshold: f64,
    #[serde(default)]
    pub cleaned_outputs: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub missing_outputs: BTreeMap<String, PathBuf>,
    #[serde(default = "default_schema")]
    pub store_schema: String,
    #[serde(default = "default_null_tokens")]
    pub null_tokens: Vec<String>,
    #[serde(default)]
    pub input_encoding: Option<String>,
    #[serde(default)]
    pub max_sentinel_ratio: Option<f64>,
    #[serde(default)]
    pub export_validated: bool,
    #[serde(default = "default_true")]
    pub export_missing: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl PipelineConfig {
    /// Loads a `.json`, `.yml` or `.yaml` file and checks its values.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => {
                serde_json::from_str::<Self>(&raw).context("Parsing JSON config")?
            }
            Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml") => {
                serde_yaml::from_str::<Self>(&raw).context("Parsing YAML config")?
            }
            _ => return Err(anyhow!("Unsupported config format for {path:?}")),
        };
        config.check()?;
        Ok(config)
    }

    pub fn check(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.missing_data_threshold),
            "missing_data_threshold must be within [0, 1], got {}",
            self.missing_data_threshold
        );
        if let Some(ratio) = self.max_sentinel_ratio {
            ensure!(
                (0.0..=1.0).contains(&ratio),
                "max_sentinel_ratio must be within [0, 1], got {ratio}"
            );
        }
        ensure!(!self.sources.is_empty(), "at least one source must be configured");
        for (label, map) in [
            ("cleaned_outputs", &self.cleaned_outputs),
            ("missing_outputs", &self.missing_outputs),
        ] {
            if let Some(unknown) = map.keys().find(|name| !self.sources.contains_key(*name)) {
                return Err(anyhow!("{label} references unknown table '{unknown}'"));
            }
        }
        Ok(())
    }

    /// Configured required columns, with each known table kind's defaults filled in
    /// for sources that have no entry of their own.
    pub fn required_columns(&self) -> RequiredColumns {
        let mut required = self.required_columns.clone();
        for name in self.sources.keys() {
            if let Some(kind) = TableKind::from_name(name) {
                required
                    .entry(name.clone())
                    .or_insert_with(|| kind.default_required_columns());
            }
        }
        required
    }

    pub fn read_options(&self) -> Result<ReadOptions> {
        Ok(ReadOptions {
            delimiter: None,
            encoding: io_utils::resolve_encoding(self.input_encoding.as_deref())?,
            null_tokens: self.null_tokens.clone(),
        })
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            max_sentinel_ratio: self.max_sentinel_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_yaml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "config.yml",
            "sources:\n  spending: raw/spending.csv\n\
             required_columns:\n  spending: [Title, Amount]\n\
             missing_data_threshold: 0.2\n",
        );
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.store_schema, "main");
        assert!(config.export_missing);
        assert!(!config.export_validated);
        assert!(config.null_tokens.iter().any(|t| t == "NA"));
        assert_eq!(config.required_columns["spending"], vec!["Title", "Amount"]);
    }

    #[test]
    fn known_kinds_fall_back_to_default_requirements() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "config.json",
            r#"{"sources": {"places": "p.csv", "spending": "s.csv", "hotels": "h.csv"},
                "required_columns": {"spending": []},
                "missing_data_threshold": 0.1}"#,
        );
        let required = PipelineConfig::load(&path).unwrap().required_columns();
        assert_eq!(required["places"], vec!["Arrival_Date", "Nights"]);
        assert!(required["spending"].is_empty());
        assert!(!required.contains_key("hotels"));
    }

    #[test]
    fn loads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "config.json",
            r#"{"sources": {"places": "p.csv"}, "missing_data_threshold": 0.1, "bucket": "travel"}"#,
        );
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.bucket.as_deref(), Some("travel"));
    }

    #[test]
    fn rejects_threshold_outside_unit_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "config.json",
            r#"{"sources": {"places": "p.csv"}, "missing_data_threshold": 1.5}"#,
        );
        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("missing_data_threshold"));
    }

    #[test]
    fn rejects_outputs_for_unknown_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "config.json",
            r#"{"sources": {"places": "p.csv"}, "missing_data_threshold": 0.1,
                "missing_outputs": {"hotels": "h.csv"}}"#,
        );
        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("hotels"));
    }
}
