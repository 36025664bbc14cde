use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::loader::resolve_input;
use crate::data::normalize::NormalizationMode;
use crate::error::MetricsError;

/// A named metrics file, e.g. `MNIST` → `MNIST-metrics.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSource {
    pub name: String,
    pub file: PathBuf,
}

impl DatasetSource {
    pub fn new(name: &str, file: &str) -> Self {
        Self {
            name: name.to_string(),
            file: PathBuf::from(file),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Base directory for relative input files. Relative to the config file.
    #[serde(default = "ReportConfig::default_data_dir")]
    pub data_dir: PathBuf,
    /// Subdirectories of `data_dir` searched in order for each input file.
    #[serde(default = "ReportConfig::default_search_dirs")]
    pub search_dirs: Vec<PathBuf>,
    #[serde(default = "ReportConfig::default_datasets")]
    pub datasets: Vec<DatasetSource>,
    #[serde(default = "ReportConfig::default_comparison_file")]
    pub comparison_file: PathBuf,
    /// Where charts go; `charts/` next to the input when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub normalization: NormalizationMode,
    /// Accuracy, NMI and ARI columns, in RGB channel order.
    #[serde(default = "ReportConfig::default_target_metrics")]
    pub target_metrics: Vec<String>,
    /// Open the viewer after rendering.
    #[serde(default)]
    pub show: bool,
}

impl ReportConfig {
    fn default_data_dir() -> PathBuf {
        PathBuf::from(".")
    }
    fn default_search_dirs() -> Vec<PathBuf> {
        vec![PathBuf::from("."), PathBuf::from("results"), PathBuf::from("..")]
    }
    fn default_datasets() -> Vec<DatasetSource> {
        vec![
            DatasetSource::new("MNIST", "MNIST-metrics.csv"),
            DatasetSource::new("Fashion-MNIST", "Fashion-MNIST-metrics.csv"),
            DatasetSource::new("Medical-MNIST", "Medical-MNIST-metrics.csv"),
        ]
    }
    fn default_comparison_file() -> PathBuf {
        PathBuf::from("MNIST-metrics-comparison.csv")
    }
    fn default_target_metrics() -> Vec<String> {
        ["TestAcc", "NMI", "ARI"].map(String::from).to_vec()
    }

    /// Read `path`, falling back to defaults when it is missing or invalid.
    /// A relative `data_dir` is anchored at the config file's directory.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config at {}; using defaults", path.display());
            return Self::default();
        }
        let mut cfg = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    log::error!("Failed to parse config {}: {err}. Using defaults.", path.display());
                    return Self::default();
                }
            },
            Err(err) => {
                log::error!("Failed to read config {}: {err}. Using defaults.", path.display());
                return Self::default();
            }
        };
        if cfg.data_dir.is_relative() {
            if let Some(parent) = path.parent() {
                cfg.data_dir = parent.join(&cfg.data_dir);
            }
        }
        cfg
    }

    pub fn resolve(&self, file: &Path) -> Result<PathBuf, MetricsError> {
        resolve_input(file, &self.data_dir, &self.search_dirs)
    }

    /// Every configured dataset with its resolved path.
    pub fn dataset_paths(&self) -> Result<Vec<(String, PathBuf)>, MetricsError> {
        self.datasets
            .iter()
            .map(|d| Ok((d.name.clone(), self.resolve(&d.file)?)))
            .collect()
    }

    /// `output_dir` if set, else `charts/` beside `input`.
    pub fn output_dir_for(&self, input: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => input
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("charts"),
        }
    }

    /// The three RGB channel columns; `None` unless exactly three are set.
    pub fn rgb_metrics(&self) -> Option<[&str; 3]> {
        match self.target_metrics.as_slice() {
            [r, g, b] => Some([r.as_str(), g.as_str(), b.as_str()]),
            _ => None,
        }
    }

    pub fn target_refs(&self) -> Vec<&str> {
        self.target_metrics.iter().map(String::as_str).collect()
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            search_dirs: Self::default_search_dirs(),
            datasets: Self::default_datasets(),
            comparison_file: Self::default_comparison_file(),
            output_dir: None,
            normalization: NormalizationMode::default(),
            target_metrics: Self::default_target_metrics(),
            show: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::scratch_dir;

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = ReportConfig::load_or_default(Path::new("/no/such/config.json"));
        assert_eq!(cfg, ReportConfig::default());
        assert_eq!(cfg.datasets.len(), 3);
        assert_eq!(cfg.rgb_metrics(), Some(["TestAcc", "NMI", "ARI"]));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = scratch_dir("cfg_partial");
        let path = dir.join("config.json");
        fs::write(
            &path,
            r#"{ "normalization": "per-column", "datasets": [{"name": "A", "file": "a.csv"}] }"#,
        )
        .unwrap();

        let cfg = ReportConfig::load_or_default(&path);
        assert_eq!(cfg.normalization, NormalizationMode::PerColumn);
        assert_eq!(cfg.datasets, vec![DatasetSource::new("A", "a.csv")]);
        assert_eq!(cfg.data_dir, dir.join("."));
        assert_eq!(cfg.comparison_file, PathBuf::from("MNIST-metrics-comparison.csv"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_file_gives_defaults() {
        let dir = scratch_dir("cfg_invalid");
        let path = dir.join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(ReportConfig::load_or_default(&path), ReportConfig::default());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn round_trip() {
        let dir = scratch_dir("cfg_roundtrip");
        let path = dir.join("config.json");
        let custom = ReportConfig {
            data_dir: dir.clone(),
            output_dir: Some(dir.join("out")),
            normalization: NormalizationMode::Off,
            show: true,
            ..ReportConfig::default()
        };
        fs::write(&path, serde_json::to_string_pretty(&custom).unwrap()).unwrap();
        assert_eq!(ReportConfig::load_or_default(&path), custom);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn output_dir_defaults_beside_input() {
        let cfg = ReportConfig::default();
        assert_eq!(
            cfg.output_dir_for(Path::new("/data/results/m.csv")),
            PathBuf::from("/data/results/charts")
        );
        let cfg = ReportConfig {
            output_dir: Some(PathBuf::from("/tmp/out")),
            ..ReportConfig::default()
        };
        assert_eq!(cfg.output_dir_for(Path::new("/data/m.csv")), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn rgb_metrics_need_three_columns() {
        let cfg = ReportConfig {
            target_metrics: vec!["TestAcc".into(), "NMI".into()],
            ..ReportConfig::default()
        };
        assert_eq!(cfg.rgb_metrics(), None);
    }
}
