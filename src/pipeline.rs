use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::Command;
use crate::config::ReportConfig;
use crate::data::comparison::{ComparisonBuilder, COMPARISON_METRICS};
use crate::data::loader::{load_collection, load_comparison};
use crate::data::model::MetricsCollection;
use crate::error::{ComparisonError, MetricsError};
use crate::render::bars::{self, BarLayout};
use crate::render::density::{self, KdeGrid, GRID_SIZE};
use crate::render::heatmaps::{self, HeatmapGrid};
use crate::render::rgb_grid::{self, RgbGrid};
use crate::render::{ChartArtifact, ChartKind};

pub const RGB_FILE: &str = "metrics_rgb.png";
pub const HEATMAPS_FILE: &str = "algorithm_performance_heatmaps.png";
pub const KDE_FILE: &str = "metrics_kde.png";

// ---------------------------------------------------------------------------
// Report – what one invocation produced
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Report {
    pub artifacts: Vec<ChartArtifact>,
    /// Charts left out because their inputs were missing or incomplete.
    pub skipped: Vec<String>,
    /// Set when a chart path stopped on a hard error.
    pub failed: bool,
}

impl Report {
    /// Unwrap `result`, logging a failure as a skip (missing inputs or
    /// columns) or as a hard error (everything else).
    fn settle<T>(&mut self, chart: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) if is_recoverable(&err) => {
                log::warn!("Skipping {chart}: {err:#}");
                self.skipped.push(chart.to_string());
                None
            }
            Err(err) => {
                log::error!("{chart} failed: {err:#}");
                self.failed = true;
                None
            }
        }
    }

    pub fn merge(&mut self, other: Report) {
        self.artifacts.extend(other.artifacts);
        self.skipped.extend(other.skipped);
        self.failed |= other.failed;
    }
}

/// Missing files, columns, algorithms or conditions only skip a chart.
fn is_recoverable(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if cause.downcast_ref::<ComparisonError>().is_some() {
            return true;
        }
        matches!(
            cause.downcast_ref::<MetricsError>(),
            Some(
                MetricsError::NotFound { .. }
                    | MetricsError::NotFoundAny { .. }
                    | MetricsError::MissingColumn { .. }
                    | MetricsError::MissingAlgorithm { .. }
                    | MetricsError::UnknownDataset(_)
                    | MetricsError::Empty
            )
        )
    })
}

// ---------------------------------------------------------------------------
// Entry-point
// ---------------------------------------------------------------------------

pub fn run(command: &Command, cfg: &ReportConfig) -> Report {
    let mut report = Report::default();
    let (rgb, heat, kde) = match command {
        Command::Rgb => (true, false, false),
        Command::Heatmaps => (false, true, false),
        Command::Kde => (false, false, true),
        Command::All => (true, true, true),
        Command::Compare { .. } | Command::View { .. } => (false, false, false),
    };

    if rgb || heat || kde {
        if let Some((collection, out_dir)) = report.settle("clustering charts", load_clustering(cfg)) {
            if rgb {
                let result = render_rgb(&collection, cfg, &out_dir.join(RGB_FILE));
                if let Some(artifact) = report.settle("RGB grid", result) {
                    report.artifacts.push(artifact);
                }
            }
            if heat {
                let result = render_heatmaps(&collection, &out_dir.join(HEATMAPS_FILE));
                if let Some(artifact) = report.settle("mini-heatmaps", result) {
                    report.artifacts.push(artifact);
                }
            }
            if kde {
                let result = render_kde(&collection, cfg, &out_dir.join(KDE_FILE));
                if let Some(artifact) = report.settle("KDE", result) {
                    report.artifacts.push(artifact);
                }
            }
        }
    }

    match command {
        Command::Compare { file } => {
            let path = comparison_path(cfg, file.as_deref());
            if let Some(path) = report.settle("comparison charts", path) {
                report.merge(run_comparison(&path, cfg));
            }
        }
        Command::All => {
            let path = cfg.resolve(&cfg.comparison_file).map_err(anyhow::Error::from);
            if let Some(path) = report.settle("comparison charts", path) {
                report.merge(run_comparison(&path, cfg));
            }
        }
        _ => {}
    }

    log::info!(
        "{} chart(s) written, {} skipped",
        report.artifacts.len(),
        report.skipped.len()
    );
    report
}

fn comparison_path(cfg: &ReportConfig, file: Option<&Path>) -> Result<PathBuf> {
    match file {
        Some(f) if f.exists() => Ok(f.to_path_buf()),
        Some(f) => Ok(cfg.resolve(f)?),
        None => Ok(cfg.resolve(&cfg.comparison_file)?),
    }
}

// ---------------------------------------------------------------------------
// Clustering charts
// ---------------------------------------------------------------------------

fn load_clustering(cfg: &ReportConfig) -> Result<(MetricsCollection, PathBuf)> {
    let sources = cfg.dataset_paths()?;
    let first = sources.first().map(|(_, p)| p.clone()).ok_or(MetricsError::Empty)?;
    let collection = load_collection(&sources, cfg.normalization, &cfg.target_refs())?;
    anyhow::ensure!(!collection.is_empty(), MetricsError::Empty);
    log::info!(
        "Loaded {} datasets × {} algorithms",
        collection.len(),
        collection.algorithms().len()
    );
    for record in collection.records() {
        log::trace!("{record}");
    }
    Ok((collection, cfg.output_dir_for(&first)))
}

fn render_rgb(collection: &MetricsCollection, cfg: &ReportConfig, path: &Path) -> Result<ChartArtifact> {
    let metrics = cfg.rgb_metrics().context("RGB grid needs exactly three target metrics")?;
    let grid = RgbGrid::from_collection(collection, metrics)?;
    rgb_grid::render(&grid, path)?;
    Ok(ChartArtifact::new("Clustering metrics as RGB", path.to_path_buf(), ChartKind::RgbGrid))
}

fn render_heatmaps(collection: &MetricsCollection, path: &Path) -> Result<ChartArtifact> {
    let grid = HeatmapGrid::from_collection(collection)?;
    heatmaps::render(&grid, path)?;
    Ok(ChartArtifact::new("Mini-heatmaps", path.to_path_buf(), ChartKind::Heatmaps))
}

fn render_kde(collection: &MetricsCollection, cfg: &ReportConfig, path: &Path) -> Result<ChartArtifact> {
    let [x, y] = match cfg.target_refs().as_slice() {
        [x, y, ..] => [*x, *y],
        _ => anyhow::bail!("KDE needs two target metrics"),
    };
    let points = collection.pooled(x, y)?;
    let grid = KdeGrid::estimate(&points, GRID_SIZE).ok_or(MetricsError::Empty)?;
    density::render(&grid, x, y, path)?;
    Ok(ChartArtifact::new(format!("KDE: {x} vs {y}"), path.to_path_buf(), ChartKind::Density))
}

// ---------------------------------------------------------------------------
// Comparison charts
// ---------------------------------------------------------------------------

/// Bar charts for every comparison metric in `path`. A metric whose pivot
/// fails is skipped; the others still render.
pub fn run_comparison(path: &Path, cfg: &ReportConfig) -> Report {
    let mut report = Report::default();
    let Some(table) = report.settle("comparison charts", load_comparison(path)) else {
        return report;
    };
    let builder = match ComparisonBuilder::new(&table) {
        Ok(builder) => builder,
        Err(err) => {
            report.settle::<()>("comparison charts", Err(err.into()));
            return report;
        }
    };
    log::info!("Comparing {} methods from {}", builder.methods().len(), path.display());
    for record in table.records() {
        log::trace!("{record:?}");
    }

    let out_dir = cfg.output_dir_for(path);
    for metric in COMPARISON_METRICS {
        let pivot = match builder.pivot(metric.column) {
            Ok(pivot) => pivot,
            Err(err) => {
                log::warn!(
                    "Could not create a valid pivot table for {}: {err}. Skipping this plot.",
                    metric.column
                );
                report.skipped.push(metric.column.to_string());
                continue;
            }
        };
        log::debug!("{}: {} methods with both conditions", metric.column, pivot.len());
        if !pivot.skipped.is_empty() {
            log::warn!(
                "{}: leaving out {:?}, not measured under both conditions",
                metric.column,
                pivot.skipped
            );
        }

        let layout = BarLayout::new(metric, &pivot);
        let chart_path = out_dir.join(metric.file_name());
        if report
            .settle(metric.column, bars::render(&layout, &chart_path))
            .is_some()
        {
            report.artifacts.push(ChartArtifact::new(
                metric.title,
                chart_path,
                ChartKind::Comparison { metric, pivot },
            ));
        }
    }
    report
}

// ---------------------------------------------------------------------------
// Stored charts
// ---------------------------------------------------------------------------

/// PNG files in `dir`, sorted by name.
pub fn scan_charts(dir: &Path) -> Result<Vec<ChartArtifact>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("png"))
        })
        .collect();
    paths.sort();
    Ok(paths
        .into_iter()
        .map(|p| {
            let title = p
                .file_stem()
                .map(|s| s.to_string_lossy().replace('_', " "))
                .unwrap_or_default();
            ChartArtifact::new(title, p, ChartKind::Stored)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::scratch_dir;

    fn cfg_in(dir: &Path) -> ReportConfig {
        ReportConfig {
            data_dir: dir.to_path_buf(),
            search_dirs: vec![PathBuf::from(".")],
            output_dir: Some(dir.join("charts")),
            ..ReportConfig::default()
        }
    }

    #[test]
    fn missing_inputs_skip_without_failing() {
        let dir = scratch_dir("pipe_missing");
        let report = run(&Command::All, &cfg_in(&dir));
        assert!(!report.failed);
        assert!(report.artifacts.is_empty());
        assert_eq!(report.skipped.len(), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_condition_skips_comparison() {
        let dir = scratch_dir("pipe_cond");
        let path = dir.join("c.csv");
        std::fs::write(&path, "Method,Data,Accuracy\nSVM,Original,0.9\nkNN,Original,0.8\n").unwrap();
        let report = run_comparison(&path, &cfg_in(&dir));
        assert!(!report.failed);
        assert!(report.artifacts.is_empty());
        assert_eq!(report.skipped, vec!["comparison charts"]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn absent_metric_columns_are_skipped_individually() {
        // Accuracy is missing and every method lacks FLOPs under PCA, so no
        // chart can be drawn, but neither stops the run.
        let dir = scratch_dir("pipe_metrics");
        let path = dir.join("c.csv");
        std::fs::write(
            &path,
            "Method,Data,Wall-clock Time (s),FLOPs\nSVM,Original,,1000\nSVM,PCA,,\n",
        )
        .unwrap();
        let report = run_comparison(&path, &cfg_in(&dir));
        assert!(!report.failed);
        assert_eq!(
            report.skipped,
            vec!["Accuracy", "Wall-clock Time (s)", "FLOPs"]
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn malformed_number_is_a_hard_error() {
        let dir = scratch_dir("pipe_bad");
        let path = dir.join("c.csv");
        std::fs::write(&path, "Method,Data,FLOPs\nSVM,Original,1.2.3\nSVM,PCA,5\n").unwrap();
        let report = run_comparison(&path, &cfg_in(&dir));
        assert!(report.failed);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn scan_lists_png_files_only() {
        let dir = scratch_dir("pipe_scan");
        std::fs::write(dir.join("b_chart.png"), b"").unwrap();
        std::fs::write(dir.join("a_chart.PNG"), b"").unwrap();
        std::fs::write(dir.join("notes.txt"), b"").unwrap();
        let charts = scan_charts(&dir).unwrap();
        let titles: Vec<&str> = charts.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["a chart", "b chart"]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn recoverable_classification() {
        let soft: anyhow::Error = MetricsError::MissingColumn { column: "NMI".into() }.into();
        assert!(is_recoverable(&soft.context("loading x")));
        let hard: anyhow::Error = MetricsError::InvalidNumber {
            row: 0,
            column: "FLOPs".into(),
            raw: "x".into(),
        }
        .into();
        assert!(!is_recoverable(&hard));
    }

    #[test]
    fn full_run_writes_every_chart() {
        let dir = scratch_dir("pipe_full");
        let header = "Algorithm,TestAcc,NMI,ARI\n";
        std::fs::write(
            dir.join("MNIST-metrics.csv"),
            format!("{header}KMeans,0.9,0.8,0.7\nGMM,0.5,0.3,0.2\nDEC,0.7,0.65,0.5\n"),
        )
        .unwrap();
        std::fs::write(
            dir.join("Fashion-MNIST-metrics.csv"),
            format!("{header}KMeans,0.6,0.55,0.4\nGMM,0.45,0.35,0.25\nDEC,0.62,0.5,0.41\n"),
        )
        .unwrap();
        std::fs::write(
            dir.join("Medical-MNIST-metrics.csv"),
            format!("{header}KMeans,95,88,81\nGMM,70,61,52\nDEC,83,79,70\n"),
        )
        .unwrap();
        std::fs::write(
            dir.join("MNIST-metrics-comparison.csv"),
            "Method,Data,Accuracy,Wall-clock Time (s),FLOPs\n\
             SVM,Original,0.97,310.5,\"240,000,000,000\"\n\
             SVM,PCA,0.955,38.2,\"28,800,000,000\"\n\
             Random Forest,Original,0.96,48.0,\"11,000,000,000\"\n\
             Random Forest,PCA,0.94,6.1,\"1,320,000,000\"\n\
             kNN,Original,0.95,95.0,\"47,000,000,000\"\n",
        )
        .unwrap();

        let report = run(&Command::All, &cfg_in(&dir));
        assert!(!report.failed);
        assert!(report.skipped.is_empty(), "{:?}", report.skipped);
        assert_eq!(report.artifacts.len(), 6);
        for artifact in &report.artifacts {
            assert!(artifact.path.exists(), "{} missing", artifact.path.display());
        }

        let names: Vec<String> = report
            .artifacts
            .iter()
            .filter_map(|a| a.path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        for expected in [
            RGB_FILE,
            HEATMAPS_FILE,
            KDE_FILE,
            "Accuracy_comparison.png",
            "Wall-clock_Time_s_comparison.png",
            "FLOPs_comparison.png",
        ] {
            assert!(names.iter().any(|n| n == expected), "{expected} not written");
        }

        // kNN has no PCA row: left out, the chart still drawn for the others.
        let accuracy = report
            .artifacts
            .iter()
            .find_map(|a| match &a.kind {
                ChartKind::Comparison { metric, pivot } if metric.column == "Accuracy" => Some(pivot),
                _ => None,
            })
            .unwrap();
        assert_eq!(accuracy.methods, vec!["SVM", "Random Forest"]);
        assert_eq!(accuracy.skipped, vec!["kNN"]);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
