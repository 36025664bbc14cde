use eframe::egui::{self, Color32, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, Legend, Plot};

use crate::color::generate_palette;
use crate::data::comparison::{ComparisonMetric, ComparisonPivot, Condition};
use crate::render::bars::{annotation, tick_label, BarLayout, BAR_WIDTH};
use crate::render::ChartKind;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Central panel – selected chart
// ---------------------------------------------------------------------------

pub fn chart_view(ui: &mut Ui, state: &mut AppState) {
    let Some(chart) = state.selected_chart().cloned() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No chart selected  (File → Open…)");
        });
        return;
    };

    ui.heading(&chart.title);
    ui.label(chart.path.display().to_string());
    ui.separator();

    let comparison = match &chart.kind {
        ChartKind::Comparison { metric, pivot } => Some((*metric, pivot)),
        _ => None,
    };

    if let (true, Some((metric, pivot))) = (state.show_values, comparison) {
        values_table(ui, metric, pivot);
        ui.separator();
    }

    match comparison {
        Some((metric, pivot)) if state.show_interactive => comparison_plot(ui, metric, pivot),
        _ => {
            let ctx = ui.ctx().clone();
            if let Some(texture) = state.texture(&ctx, &chart.path) {
                ui.add(
                    egui::Image::from_texture(egui::load::SizedTexture::from_handle(&texture))
                        .shrink_to_fit(),
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Interactive grouped bars
// ---------------------------------------------------------------------------

fn comparison_plot(ui: &mut Ui, metric: ComparisonMetric, pivot: &ComparisonPivot) {
    let layout = BarLayout::new(metric, pivot);
    let base = layout.baseline();
    let colors = generate_palette(Condition::ALL.len());
    let methods = layout.methods.clone();
    let scale = metric.scale;

    Plot::new("comparison_plot")
        .legend(Legend::default())
        .x_axis_label("Method")
        .y_axis_label(metric.axis_label())
        .x_axis_formatter(move |mark, _range| {
            method_label(&methods, mark.value).unwrap_or_default().to_string()
        })
        .y_axis_formatter(move |mark, _range| tick_label(scale, mark.value))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (condition, color) in Condition::ALL.into_iter().zip(&colors) {
                let bars: Vec<Bar> = layout
                    .bars
                    .iter()
                    .filter(|b| b.condition == condition)
                    .map(|b| {
                        Bar::new(b.x, b.top - base)
                            .base_offset(base)
                            .width(BAR_WIDTH)
                            .name(format!("{}: {}", layout.methods[b.method], b.label))
                    })
                    .collect();
                plot_ui.bar_chart(
                    BarChart::new(bars)
                        .name(condition.legend())
                        .color(Color32::from_rgb(color.red, color.green, color.blue)),
                );
            }
        });
}

/// Method name for an x tick sitting on a group centre.
fn method_label(methods: &[String], x: f64) -> Option<&str> {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return None;
    }
    methods.get(i as usize).map(String::as_str)
}

// ---------------------------------------------------------------------------
// Values table
// ---------------------------------------------------------------------------

fn values_table(ui: &mut Ui, metric: ComparisonMetric, pivot: &ComparisonPivot) {
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(140.0))
        .columns(Column::auto().at_least(90.0), 3)
        .header(20.0, |mut header| {
            for title in ["Method", Condition::Original.label(), Condition::Pca.label(), "Change"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for method in &pivot.methods {
                let (Some(original), Some(pca)) = (
                    pivot.value(method, Condition::Original),
                    pivot.value(method, Condition::Pca),
                ) else {
                    continue;
                };
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(method);
                    });
                    row.col(|ui| {
                        ui.label(annotation(metric.scale, original));
                    });
                    row.col(|ui| {
                        ui.label(annotation(metric.scale, pca));
                    });
                    row.col(|ui| {
                        ui.label(
                            relative_change(original, pca)
                                .map(|c| format!("{c:+.1}%"))
                                .unwrap_or_else(|| "–".to_string()),
                        );
                    });
                });
            }
        });
}

/// PCA relative to Original, in percent.
fn relative_change(original: f64, pca: f64) -> Option<f64> {
    (original != 0.0 && original.is_finite() && pca.is_finite())
        .then(|| (pca - original) / original.abs() * 100.0)
}
