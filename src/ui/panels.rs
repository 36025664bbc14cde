use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::pipeline::{run_comparison, scan_charts};
use crate::render::ChartKind;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – chart list
// ---------------------------------------------------------------------------

pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Charts");
    ui.separator();

    if state.charts.is_empty() {
        ui.label("No charts rendered.");
        return;
    }

    let mut clicked = None;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (i, chart) in state.charts.iter().enumerate() {
                let mut text = RichText::new(&chart.title);
                if matches!(chart.kind, ChartKind::Comparison { .. }) {
                    text = text.italics();
                }
                if ui
                    .selectable_label(state.selected == Some(i), text)
                    .on_hover_text(chart.path.display().to_string())
                    .clicked()
                {
                    clicked = Some(i);
                }
            }

            ui.separator();
            ui.strong("Settings");
            ui.label(format!("Normalization: {:?}", state.config.normalization));
            ui.label(format!("Targets: {}", state.config.target_metrics.join(", ")));
        });

    if let Some(i) = clicked {
        state.select(i);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open comparison CSV…").clicked() {
                open_comparison_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open chart folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label(format!("{} charts", state.charts.len()));
        ui.separator();

        if ui
            .selectable_label(state.show_interactive, "Interactive bars")
            .clicked()
        {
            state.show_interactive = !state.show_interactive;
        }
        if ui
            .selectable_label(state.show_values, "Values table")
            .clicked()
        {
            state.show_values = !state.show_values;
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

/// Pick a comparison CSV and render its bar charts into the viewer.
pub fn open_comparison_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open comparison metrics")
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        let report = run_comparison(&path, &state.config);
        log::info!(
            "Rendered {} comparison charts from {}",
            report.artifacts.len(),
            path.display()
        );
        state.add_report(report);
    }
}

pub fn open_folder_dialog(state: &mut AppState) {
    let Some(dir) = rfd::FileDialog::new()
        .set_title("Open chart folder")
        .pick_folder()
    else {
        return;
    };
    match scan_charts(&dir) {
        Ok(charts) => {
            log::info!("Found {} charts in {}", charts.len(), dir.display());
            state.set_charts(charts);
        }
        Err(e) => {
            log::error!("Failed to list charts: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
