use std::f64::consts::PI;
use std::path::Path;

use anyhow::Result;
use plotters::prelude::*;

use super::{prepare_output, rgb, FONT};
use crate::color::Colormap;

/// Grid points per axis.
pub const GRID_SIZE: usize = 100;
/// Grid extends this many kernel bandwidths past the data.
pub const CUT: f64 = 3.0;
/// Number of filled contour levels.
pub const LEVELS: usize = 100;
/// Stand-in standard deviation for an axis with no spread.
const FALLBACK_STD: f64 = 0.05;

/// Gaussian kernel density estimate evaluated on a regular grid.
#[derive(Debug, Clone)]
pub struct KdeGrid {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    /// Row-major: `density[iy * xs.len() + ix]`.
    pub density: Vec<f64>,
    /// Kernel covariance `[[sxx, sxy], [sxy, syy]]`.
    pub kernel: [[f64; 2]; 2],
}

impl KdeGrid {
    /// Scott's rule: data covariance scaled by `n^(-1/3)` (factor² in 2-D).
    /// Falls back to a diagonal kernel when the covariance is singular.
    pub fn estimate(points: &[(f64, f64)], grid_size: usize) -> Option<Self> {
        if points.is_empty() || grid_size < 2 {
            return None;
        }
        let kernel = kernel_covariance(points);
        let det = kernel[0][0] * kernel[1][1] - kernel[0][1] * kernel[1][0];
        let inv = [
            [kernel[1][1] / det, -kernel[0][1] / det],
            [-kernel[1][0] / det, kernel[0][0] / det],
        ];
        let norm = 1.0 / (2.0 * PI * det.sqrt() * points.len() as f64);

        let axis = |pick: fn(&(f64, f64)) -> f64, var: f64| {
            let lo = points.iter().map(pick).fold(f64::INFINITY, f64::min) - CUT * var.sqrt();
            let hi = points.iter().map(pick).fold(f64::NEG_INFINITY, f64::max) + CUT * var.sqrt();
            let step = (hi - lo) / (grid_size - 1) as f64;
            (0..grid_size).map(|i| lo + i as f64 * step).collect::<Vec<_>>()
        };
        let xs = axis(|p| p.0, kernel[0][0]);
        let ys = axis(|p| p.1, kernel[1][1]);

        let mut density = Vec::with_capacity(grid_size * grid_size);
        for &y in &ys {
            for &x in &xs {
                let sum: f64 = points
                    .iter()
                    .map(|&(px, py)| {
                        let (dx, dy) = (x - px, y - py);
                        let q = dx * (inv[0][0] * dx + inv[0][1] * dy)
                            + dy * (inv[1][0] * dx + inv[1][1] * dy);
                        (-0.5 * q).exp()
                    })
                    .sum();
                density.push(sum * norm);
            }
        }

        Some(Self {
            xs,
            ys,
            density,
            kernel,
        })
    }

    pub fn at(&self, ix: usize, iy: usize) -> f64 {
        self.density[iy * self.xs.len() + ix]
    }

    pub fn max(&self) -> f64 {
        self.density.iter().copied().fold(0.0, f64::max)
    }

    pub fn cell_size(&self) -> (f64, f64) {
        (self.xs[1] - self.xs[0], self.ys[1] - self.ys[0])
    }

    /// Riemann sum of the density over the grid; close to 1.
    pub fn mass(&self) -> f64 {
        let (dx, dy) = self.cell_size();
        self.density.iter().sum::<f64>() * dx * dy
    }

    /// Filled-contour level of a density value, `0..LEVELS`.
    pub fn level(&self, value: f64, levels: usize) -> usize {
        let max = self.max();
        if max <= 0.0 {
            return 0;
        }
        ((value / max * levels as f64).floor() as usize).min(levels - 1)
    }
}

fn kernel_covariance(points: &[(f64, f64)]) -> [[f64; 2]; 2] {
    let n = points.len() as f64;
    let factor_sq = n.powf(-1.0 / 3.0);

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    if points.len() > 1 {
        let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
        let my = points.iter().map(|p| p.1).sum::<f64>() / n;
        for &(x, y) in points {
            sxx += (x - mx) * (x - mx);
            syy += (y - my) * (y - my);
            sxy += (x - mx) * (y - my);
        }
        sxx /= n - 1.0;
        syy /= n - 1.0;
        sxy /= n - 1.0;
    }

    let det = sxx * syy - sxy * sxy;
    if det <= 1e-12 * (sxx * syy).max(f64::MIN_POSITIVE) || det <= 0.0 {
        log::warn!("KDE input has degenerate covariance; using a diagonal kernel");
        let floor = FALLBACK_STD * FALLBACK_STD;
        sxx = if sxx > 1e-12 { sxx } else { floor };
        syy = if syy > 1e-12 { syy } else { floor };
        sxy = 0.0;
    }
    [
        [sxx * factor_sq, sxy * factor_sq],
        [sxy * factor_sq, syy * factor_sq],
    ]
}

pub fn render(grid: &KdeGrid, x_label: &str, y_label: &str, path: &Path) -> Result<()> {
    prepare_output(path)?;
    let cmap = Colormap::mako();
    let (dx, dy) = grid.cell_size();
    let x_range = grid.xs[0] - dx / 2.0..grid.xs[grid.xs.len() - 1] + dx / 2.0;
    let y_range = grid.ys[0] - dy / 2.0..grid.ys[grid.ys.len() - 1] + dy / 2.0;

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Bivariate KDE: {x_label} vs {y_label} (All Datasets/Algorithms)"),
            (FONT, 20),
        )
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    log::debug!(
        "KDE kernel {:?}, grid mass {:.3}, {} levels of {}",
        grid.kernel,
        grid.mass(),
        LEVELS,
        cmap.name
    );
    let cells = (0..grid.ys.len()).flat_map(|iy| (0..grid.xs.len()).map(move |ix| (ix, iy)));
    chart.draw_series(cells.map(|(ix, iy)| {
        let (x, y) = (grid.xs[ix], grid.ys[iy]);
        let t = grid.level(grid.at(ix, iy), LEVELS) as f64 / (LEVELS - 1) as f64;
        Rectangle::new(
            [(x - dx / 2.0, y - dy / 2.0), (x + dx / 2.0, y + dy / 2.0)],
            rgb(cmap.at(t)).filled(),
        )
    }))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .x_label_formatter(&|v| format!("{v:.2}"))
        .y_label_formatter(&|v| format!("{v:.2}"))
        .draw()?;

    root.present()?;
    log::info!("Saved chart: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cloud() -> Vec<(f64, f64)> {
        vec![
            (0.9, 0.8),
            (0.5, 0.3),
            (0.7, 0.65),
            (0.82, 0.71),
            (0.6, 0.45),
            (0.95, 0.9),
            (0.4, 0.35),
        ]
    }

    #[test]
    fn density_integrates_to_one() {
        let grid = KdeGrid::estimate(&cloud(), GRID_SIZE).unwrap();
        assert_abs_diff_eq!(grid.mass(), 1.0, epsilon = 0.03);
    }

    #[test]
    fn symmetric_points_give_symmetric_density() {
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        let grid = KdeGrid::estimate(&pts, 21).unwrap();
        let last = 20;
        for iy in 0..21 {
            for ix in 0..21 {
                assert_abs_diff_eq!(grid.at(ix, iy), grid.at(last - ix, iy), epsilon = 1e-12);
                assert_abs_diff_eq!(grid.at(ix, iy), grid.at(ix, last - iy), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn scott_factor_scales_covariance() {
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        let k = kernel_covariance(&pts);
        // sample variance 1/3 per axis, zero correlation, n^(-1/3) with n = 4
        assert_abs_diff_eq!(k[0][0], (1.0 / 3.0) * 4f64.powf(-1.0 / 3.0), epsilon = 1e-12);
        assert_abs_diff_eq!(k[0][1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn collinear_points_fall_back_to_diagonal() {
        let pts = vec![(0.1, 0.2), (0.5, 0.6), (0.9, 1.0)];
        let grid = KdeGrid::estimate(&pts, 50).unwrap();
        assert_eq!(grid.kernel[0][1], 0.0);
        assert!(grid.max().is_finite() && grid.max() > 0.0);
    }

    #[test]
    fn single_point_is_supported() {
        let grid = KdeGrid::estimate(&[(0.5, 0.5)], 11).unwrap();
        let peak = grid.at(5, 5);
        assert_abs_diff_eq!(peak, grid.max(), epsilon = 1e-12);
        assert!(KdeGrid::estimate(&[], 11).is_none());
    }

    #[test]
    fn levels_cover_range() {
        let grid = KdeGrid::estimate(&cloud(), 30).unwrap();
        assert_eq!(grid.level(grid.max(), LEVELS), LEVELS - 1);
        assert_eq!(grid.level(0.0, LEVELS), 0);
    }
}
