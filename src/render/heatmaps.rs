use std::path::Path;

use anyhow::Result;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::{format_general, prepare_output, rgb, FONT};
use crate::color::{contrasting_text, Colormap};
use crate::data::model::MetricsCollection;
use crate::error::MetricsError;

/// Fixed colour scale of every panel.
pub const VMIN: f64 = 0.0;
pub const VMAX: f64 = 1.0;

/// One single-row heatmap: all metrics of one algorithm on one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapPanel {
    pub dataset: String,
    pub algorithm: String,
    pub values: Vec<f64>,
    /// Cell annotations, two significant digits.
    pub labels: Vec<String>,
}

impl HeatmapPanel {
    pub fn title(&self) -> String {
        format!("{} / {}", self.dataset, self.algorithm)
    }
}

/// Panels laid out with one row per dataset and one column per algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapGrid {
    pub datasets: Vec<String>,
    pub algorithms: Vec<String>,
    pub metrics: Vec<String>,
    pub panels: Vec<HeatmapPanel>,
}

impl HeatmapGrid {
    pub fn from_collection(collection: &MetricsCollection) -> Result<Self, MetricsError> {
        let datasets: Vec<String> = collection.datasets().iter().map(|d| d.to_string()).collect();
        let algorithms = collection.algorithms().to_vec();
        let metrics = collection.metrics().to_vec();
        let metric_refs: Vec<&str> = metrics.iter().map(String::as_str).collect();

        let mut panels = Vec::with_capacity(datasets.len() * algorithms.len());
        for ds in &datasets {
            for alg in &algorithms {
                let values = collection.values(ds, alg, &metric_refs)?;
                let labels = values.iter().map(|v| format_general(*v, 2)).collect();
                panels.push(HeatmapPanel {
                    dataset: ds.clone(),
                    algorithm: alg.clone(),
                    values,
                    labels,
                });
            }
        }
        Ok(Self {
            datasets,
            algorithms,
            metrics,
            panels,
        })
    }

    /// (rows, columns) of the panel grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.datasets.len(), self.algorithms.len())
    }

    pub fn panel(&self, dataset: usize, algorithm: usize) -> &HeatmapPanel {
        &self.panels[dataset * self.algorithms.len() + algorithm]
    }
}

pub fn render(grid: &HeatmapGrid, path: &Path) -> Result<()> {
    prepare_output(path)?;
    let (rows, cols) = grid.shape();
    let size = (400 * cols as u32, 200 * rows as u32 + 60);
    let cmap = Colormap::yl_gn_bu();
    let n_metrics = grid.metrics.len();

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let body = root.titled("Algorithm Performance Metrics Across Datasets", (FONT, 24))?;
    let areas = body.split_evenly((rows, cols));

    let centered = Pos::new(HPos::Center, VPos::Center);
    let label_style = TextStyle::from((FONT, 12).into_font()).pos(Pos::new(HPos::Center, VPos::Top));

    for (idx, area) in areas.iter().enumerate() {
        let panel = grid.panel(idx / cols, idx % cols);
        let mut chart = ChartBuilder::on(area)
            .caption(panel.title(), (FONT, 15))
            .margin(8)
            .x_label_area_size(22)
            .build_cartesian_2d(0f64..n_metrics as f64, 0f64..1f64)?;

        chart.draw_series(panel.values.iter().enumerate().map(|(k, &v)| {
            let fill = rgb(cmap.scaled(v, VMIN, VMAX));
            Rectangle::new([(k as f64, 0.0), (k as f64 + 1.0, 1.0)], fill.filled())
        }))?;

        chart.draw_series(panel.values.iter().zip(&panel.labels).enumerate().map(
            |(k, (&v, label))| {
                let ink = rgb(contrasting_text(cmap.scaled(v, VMIN, VMAX)));
                let style = (FONT, 15).into_font().color(&ink).pos(centered);
                Text::new(label.clone(), (k as f64 + 0.5, 0.5), style)
            },
        ))?;

        for (k, metric) in grid.metrics.iter().enumerate() {
            let (x, y) = chart.backend_coord(&(k as f64 + 0.5, 0.0));
            area.draw(&Text::new(metric.clone(), (x, y + 4), label_style.clone()))?;
        }
    }

    root.present()?;
    log::info!("Saved chart: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::table;

    #[test]
    fn panels_are_dataset_major() {
        let metrics = ["TestAcc", "NMI", "ARI"];
        let a = table(&["K", "D"], &metrics, &[&[0.93, 0.5, 1.0], &[0.1, 0.2, 0.3]]);
        let b = table(&["K", "D"], &metrics, &[&[0.4, 0.5, 0.6], &[0.7, 0.8, 0.9]]);
        let c = MetricsCollection::from_tables(vec![("MNIST".into(), a), ("Fashion".into(), b)])
            .unwrap();
        let grid = HeatmapGrid::from_collection(&c).unwrap();

        assert_eq!(grid.shape(), (2, 2));
        let p = grid.panel(0, 0);
        assert_eq!((p.dataset.as_str(), p.algorithm.as_str()), ("MNIST", "K"));
        assert_eq!(p.labels, vec!["0.93", "0.5", "1"]);
        let p = grid.panel(1, 1);
        assert_eq!(p.title(), "Fashion / D");
        assert_eq!(p.values, vec![0.7, 0.8, 0.9]);
    }

    #[test]
    fn single_panel_grid() {
        let c = MetricsCollection::from_tables(vec![(
            "MNIST".into(),
            table(&["K"], &["NMI"], &[&[0.25]]),
        )])
        .unwrap();
        let grid = HeatmapGrid::from_collection(&c).unwrap();
        assert_eq!(grid.shape(), (1, 1));
        assert_eq!(grid.panel(0, 0).labels, vec!["0.25"]);
    }

    #[test]
    fn render_writes_annotated_png() {
        let metrics = ["TestAcc", "NMI", "ARI"];
        let c = MetricsCollection::from_tables(vec![(
            "MNIST".into(),
            table(&["K", "D"], &metrics, &[&[0.93, 0.05, 1.0], &[0.1, 0.6, 0.3]]),
        )])
        .unwrap();
        let grid = HeatmapGrid::from_collection(&c).unwrap();
        let dir = crate::data::loader::scratch_dir("heatmaps_render");
        let path = dir.join("charts").join("heatmaps.png");
        render(&grid, &path).unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
