//! Chart rendering: shaped numeric data → PNG.
//!
//! ```text
//!   MetricsCollection ──► RgbGrid ───────► metrics_rgb.png
//!          │        └───► HeatmapGrid ───► algorithm_performance_heatmaps.png
//!          └─ pooled ───► KdeGrid ───────► metrics_kde.png
//!   ComparisonPivot ────► BarLayout ─────► <metric>_comparison.png
//! ```
//!
//! Every module splits into a pure shaping step (tested) and a `render`
//! function that draws with plotters' bitmap backend.

pub mod bars;
pub mod density;
pub mod heatmaps;
pub mod rgb_grid;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use palette::Srgb;
use plotters::style::RGBColor;

use crate::data::comparison::{ComparisonMetric, ComparisonPivot};

pub const FONT: &str = "sans-serif";

/// What a rendered chart shows; the viewer uses it to offer extra views.
#[derive(Debug, Clone)]
pub enum ChartKind {
    RgbGrid,
    Heatmaps,
    Density,
    Comparison {
        metric: ComparisonMetric,
        pivot: ComparisonPivot,
    },
    /// A PNG found on disk with no data attached.
    Stored,
}

/// A chart written to disk.
#[derive(Debug, Clone)]
pub struct ChartArtifact {
    pub title: String,
    pub path: PathBuf,
    pub kind: ChartKind,
}

impl ChartArtifact {
    pub fn new(title: impl Into<String>, path: PathBuf, kind: ChartKind) -> Self {
        Self {
            title: title.into(),
            path,
            kind,
        }
    }
}

pub(crate) fn rgb(c: Srgb<u8>) -> RGBColor {
    RGBColor(c.red, c.green, c.blue)
}

/// Create the parent directory of `path` if needed.
pub(crate) fn prepare_output(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    Ok(())
}

/// Python-style `{:.Ne}`: `1.20e+06`, `3.00e-04`.
pub fn format_scientific(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let raw = format!("{value:.precision$e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => raw,
    }
}

/// Python-style `{:.Ng}`: `N` significant digits, trailing zeros dropped,
/// scientific notation outside `1e-4 ..= 10^N`.
pub fn format_general(value: f64, significant: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let precision = significant.max(1) - 1;
    let sci = format!("{value:.precision$e}");
    let exp: i32 = sci
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);

    if exp < -4 || exp >= significant.max(1) as i32 {
        let (mantissa, _) = sci.split_once('e').unwrap_or((&sci, ""));
        let mantissa = trim_zeros(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let decimals = (significant.max(1) as i32 - 1 - exp).max(0) as usize;
        trim_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scientific_matches_python() {
        assert_eq!(format_scientific(1_200_000.0, 2), "1.20e+06");
        assert_eq!(format_scientific(0.0003, 2), "3.00e-04");
        assert_eq!(format_scientific(12.5, 2), "1.25e+01");
        assert_eq!(format_scientific(1.0, 2), "1.00e+00");
    }

    #[test]
    fn general_matches_python() {
        assert_eq!(format_general(0.93, 2), "0.93");
        assert_eq!(format_general(0.5, 2), "0.5");
        assert_eq!(format_general(1.0, 2), "1");
        assert_eq!(format_general(0.056, 2), "0.056");
        assert_eq!(format_general(0.999, 2), "1");
        assert_eq!(format_general(12.4, 2), "12");
        assert_eq!(format_general(123.0, 2), "1.2e+02");
        assert_eq!(format_general(0.00001, 2), "1e-05");
        assert_eq!(format_general(0.0, 2), "0");
    }
}
