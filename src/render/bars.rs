use std::path::Path;

use anyhow::Result;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::{format_scientific, prepare_output, rgb, FONT};
use crate::color::generate_palette;
use crate::data::comparison::{AxisScale, ComparisonMetric, ComparisonPivot, Condition};

pub const BAR_WIDTH: f64 = 0.35;

/// One bar in plot space. On a log axis `top` is `log10(value)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub method: usize,
    pub condition: Condition,
    pub x: f64,
    pub value: f64,
    pub top: f64,
    pub label: String,
}

/// Grouped bars for one comparison metric: per method, one bar per
/// condition at `method ± BAR_WIDTH / 2`.
#[derive(Debug, Clone)]
pub struct BarLayout {
    pub metric: ComparisonMetric,
    pub methods: Vec<String>,
    pub bars: Vec<Bar>,
    /// Vertical extent in plot space.
    pub y_range: (f64, f64),
}

impl BarLayout {
    pub fn new(metric: ComparisonMetric, pivot: &ComparisonPivot) -> Self {
        let values: Vec<f64> = Condition::ALL
            .iter()
            .flat_map(|c| pivot.series(*c).iter().copied())
            .collect();
        let y_range = match metric.scale {
            AxisScale::Linear => linear_range(&values),
            AxisScale::Log => log_range(&values),
        };

        let mut bars = Vec::new();
        for (k, condition) in Condition::ALL.into_iter().enumerate() {
            let offset = (k as f64 - 0.5) * BAR_WIDTH;
            for (i, &value) in pivot.series(condition).iter().enumerate() {
                let Some(top) = plot_value(metric.scale, value) else {
                    log::debug!(
                        "{}: {} under {condition} has no bar on a log axis",
                        metric.column,
                        pivot.methods[i]
                    );
                    continue;
                };
                bars.push(Bar {
                    method: i,
                    condition,
                    x: i as f64 + offset,
                    value,
                    top,
                    label: annotation(metric.scale, value),
                });
            }
        }

        Self {
            metric,
            methods: pivot.methods.clone(),
            bars,
            y_range,
        }
    }

    /// Base of every bar in plot space.
    pub fn baseline(&self) -> f64 {
        match self.metric.scale {
            AxisScale::Linear => 0.0,
            AxisScale::Log => self.y_range.0,
        }
    }
}

/// Value as drawn: unchanged on a linear axis, `log10` on a log axis.
/// Non-positive values have no position on a log axis.
pub fn plot_value(scale: AxisScale, value: f64) -> Option<f64> {
    match scale {
        AxisScale::Linear => value.is_finite().then_some(value),
        AxisScale::Log => (value > 0.0 && value.is_finite()).then(|| value.log10()),
    }
}

/// Text shown above a bar.
pub fn annotation(scale: AxisScale, value: f64) -> String {
    match scale {
        AxisScale::Linear => format!("{value:.3}"),
        AxisScale::Log => format_scientific(value, 2),
    }
}

/// Y tick text for a plot-space position.
pub fn tick_label(scale: AxisScale, y: f64) -> String {
    match scale {
        AxisScale::Linear => format!("{y:.2}"),
        AxisScale::Log => format_scientific(10f64.powf(y), 0),
    }
}

fn linear_range(values: &[f64]) -> (f64, f64) {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (lo, hi) = finite.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if hi - lo <= f64::EPSILON {
        return (lo, lo + 1.0);
    }
    (lo * 1.1, hi * 1.1)
}

/// Whole decades around the positive values, plus headroom for labels.
fn log_range(values: &[f64]) -> (f64, f64) {
    let logs: Vec<f64> = values
        .iter()
        .filter_map(|v| plot_value(AxisScale::Log, *v))
        .collect();
    if logs.is_empty() {
        return (0.0, 1.0);
    }
    let lo = logs.iter().copied().fold(f64::INFINITY, f64::min).floor();
    let hi = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (lo, (hi + 0.35).ceil().max(lo + 1.0))
}

pub fn render(layout: &BarLayout, path: &Path) -> Result<()> {
    prepare_output(path)?;
    let n = layout.methods.len();
    let (y_lo, y_hi) = layout.y_range;
    let scale = layout.metric.scale;
    let colors = generate_palette(Condition::ALL.len());

    let root = BitMapBackend::new(path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(layout.metric.chart_title(), (FONT, 24))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5f64..n as f64 - 0.5, y_lo..y_hi)?;

    let y_formatter = |v: &f64| tick_label(scale, *v);
    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .x_labels(0)
        .light_line_style(TRANSPARENT)
        .bold_line_style(BLACK.mix(0.15))
        .x_desc("Method")
        .y_desc(layout.metric.axis_label())
        .axis_desc_style((FONT, 18))
        .y_label_formatter(&y_formatter);
    if scale == AxisScale::Log {
        mesh.y_labels((y_hi - y_lo).round() as usize + 1);
    }
    mesh.draw()?;

    let base = layout.baseline();
    for (condition, color) in Condition::ALL.into_iter().zip(&colors) {
        let fill = rgb(*color);
        chart
            .draw_series(
                layout
                    .bars
                    .iter()
                    .filter(|b| b.condition == condition)
                    .map(|b| {
                        Rectangle::new(
                            [(b.x - BAR_WIDTH / 2.0, base), (b.x + BAR_WIDTH / 2.0, b.top)],
                            fill.filled(),
                        )
                    }),
            )?
            .label(condition.legend())
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], fill.filled()));
    }

    let above = TextStyle::from((FONT, 12).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
    chart.draw_series(
        layout
            .bars
            .iter()
            .map(|b| Text::new(b.label.clone(), (b.x, b.top), above.clone())),
    )?;

    let below = TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Center, VPos::Top));
    for (i, method) in layout.methods.iter().enumerate() {
        let (x, y) = chart.backend_coord(&(i as f64, y_lo));
        root.draw(&Text::new(method.clone(), (x, y + 6), below.clone()))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .label_font((FONT, 16))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    log::info!("Saved chart: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::comparison::COMPARISON_METRICS;
    use approx::assert_abs_diff_eq;

    fn pivot(metric: &str, original: Vec<f64>, pca: Vec<f64>) -> ComparisonPivot {
        ComparisonPivot {
            metric: metric.to_string(),
            methods: (0..original.len()).map(|i| format!("M{i}")).collect(),
            original,
            pca,
            skipped: Vec::new(),
        }
    }

    #[test]
    fn linear_bars_straddle_method_position() {
        let layout = BarLayout::new(
            COMPARISON_METRICS[0],
            &pivot("Accuracy", vec![0.9, 0.8], vec![0.85, 0.7]),
        );
        assert_eq!(layout.bars.len(), 4);
        let first = &layout.bars[0];
        assert_eq!(first.condition, Condition::Original);
        assert_abs_diff_eq!(first.x, -BAR_WIDTH / 2.0);
        assert_eq!(first.label, "0.900");
        let pca_second = layout
            .bars
            .iter()
            .find(|b| b.condition == Condition::Pca && b.method == 1)
            .unwrap();
        assert_abs_diff_eq!(pca_second.x, 1.0 + BAR_WIDTH / 2.0);
        assert_eq!(pca_second.label, "0.700");
        assert_eq!(layout.baseline(), 0.0);
        assert!(layout.y_range.1 >= 0.9);
    }

    #[test]
    fn log_bars_use_decades_and_scientific_labels() {
        let layout = BarLayout::new(
            COMPARISON_METRICS[2],
            &pivot("FLOPs", vec![1_200_000.0, 3.5e9], vec![250_000.0, 0.0]),
        );
        // the zero bar cannot be placed on a log axis
        assert_eq!(layout.bars.len(), 3);
        assert_eq!(layout.y_range.0, 5.0);
        assert!(layout.y_range.1 >= 3.5e9f64.log10());
        let labels: Vec<&str> = layout.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["1.20e+06", "3.50e+09", "2.50e+05"]);
        assert_abs_diff_eq!(layout.bars[0].top, 1_200_000f64.log10(), epsilon = 1e-12);
        assert_eq!(layout.baseline(), 5.0);
    }

    #[test]
    fn plot_value_rules() {
        assert_eq!(plot_value(AxisScale::Log, -1.0), None);
        assert_eq!(plot_value(AxisScale::Log, 100.0), Some(2.0));
        assert_eq!(plot_value(AxisScale::Linear, -1.0), Some(-1.0));
        assert_eq!(plot_value(AxisScale::Linear, f64::NAN), None);
    }

    #[test]
    fn tick_labels() {
        assert_eq!(tick_label(AxisScale::Log, 5.0), "1e+05");
        assert_eq!(tick_label(AxisScale::Linear, 0.5), "0.50");
    }

    #[test]
    fn flat_linear_range_is_widened() {
        assert_eq!(linear_range(&[0.0, 0.0]), (0.0, 1.0));
        let (lo, hi) = linear_range(&[-0.2, 0.5]);
        assert!(lo < -0.2 && hi > 0.5);
    }
}
