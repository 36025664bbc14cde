use std::path::Path;

use anyhow::Result;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::{prepare_output, rgb, FONT};
use crate::color::{inverted_rgb, to_rgb8};
use crate::data::model::MetricsCollection;
use crate::error::MetricsError;

/// Inverted (accuracy, NMI, ARI) colour per (algorithm, dataset) cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbGrid {
    pub algorithms: Vec<String>,
    pub datasets: Vec<String>,
    /// Row-major: algorithm `i`, dataset `j` at `i * datasets.len() + j`.
    pub cells: Vec<[f64; 3]>,
}

impl RgbGrid {
    /// `metrics` names the columns feeding the red, green and blue channels.
    pub fn from_collection(
        collection: &MetricsCollection,
        metrics: [&str; 3],
    ) -> Result<Self, MetricsError> {
        let algorithms = collection.algorithms().to_vec();
        let datasets: Vec<String> = collection.datasets().iter().map(|d| d.to_string()).collect();

        let mut cells = Vec::with_capacity(algorithms.len() * datasets.len());
        for alg in &algorithms {
            for ds in &datasets {
                let v = collection.values(ds, alg, &metrics)?;
                cells.push(inverted_rgb([v[0], v[1], v[2]]));
            }
        }
        Ok(Self {
            algorithms,
            datasets,
            cells,
        })
    }

    pub fn get(&self, algorithm: usize, dataset: usize) -> [f64; 3] {
        self.row(algorithm)[dataset]
    }

    /// Cells of one algorithm, one per dataset.
    pub fn row(&self, algorithm: usize) -> &[[f64; 3]] {
        let n = self.datasets.len();
        &self.cells[algorithm * n..(algorithm + 1) * n]
    }
}

/// Draw the grid as an image: algorithms top to bottom, datasets left to
/// right, white lines between cells.
pub fn render(grid: &RgbGrid, path: &Path) -> Result<()> {
    prepare_output(path)?;
    let n_ds = grid.datasets.len();
    let n_alg = grid.algorithms.len();
    let size = ((200 + 120 * n_ds as u32).max(600), (160 + 50 * n_alg as u32).max(500));

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Clustering Metrics as RGB (R=Accuracy, G=NMI, B=ARI)",
            (FONT, 20),
        )
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(140)
        .build_cartesian_2d(0f64..n_ds as f64, 0f64..n_alg as f64)?;

    // Row 0 at the top, like an image.
    let top = |i: usize| (n_alg - i) as f64;

    chart.draw_series((0..n_alg).flat_map(|i| {
        (0..n_ds).map(move |j| {
            let color = rgb(to_rgb8(grid.get(i, j)));
            Rectangle::new(
                [(j as f64, top(i)), (j as f64 + 1.0, top(i) - 1.0)],
                color.filled(),
            )
        })
    }))?;

    let grid_line = WHITE.stroke_width(2);
    chart.draw_series((1..n_ds).map(|j| {
        PathElement::new(vec![(j as f64, 0.0), (j as f64, n_alg as f64)], grid_line)
    }))?;
    chart.draw_series((1..n_alg).map(|i| {
        PathElement::new(vec![(0.0, i as f64), (n_ds as f64, i as f64)], grid_line)
    }))?;

    let y_style = TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Right, VPos::Center));
    for (i, alg) in grid.algorithms.iter().enumerate() {
        let (x, y) = chart.backend_coord(&(0.0, top(i) - 0.5));
        root.draw(&Text::new(alg.clone(), (x - 8, y), y_style.clone()))?;
    }
    let x_style = TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Center, VPos::Top));
    for (j, ds) in grid.datasets.iter().enumerate() {
        let (x, y) = chart.backend_coord(&(j as f64 + 0.5, 0.0));
        root.draw(&Text::new(ds.clone(), (x, y + 8), x_style.clone()))?;
    }

    root.present()?;
    log::info!("Saved chart: {}", path.display());
    Ok(())
}
