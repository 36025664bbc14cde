use anyhow::{anyhow, Result};
use eframe::egui;

use crate::config::ReportConfig;
use crate::render::ChartArtifact;
use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct MetricsViewerApp {
    pub state: AppState,
}

impl MetricsViewerApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for MetricsViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: chart list ----
        egui::SidePanel::left("chart_list")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: selected chart ----
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                plot::chart_view(ui, &mut self.state);
            });
        });
    }
}

/// Open the viewer on `charts` and block until the window closes.
pub fn run_viewer(charts: Vec<ChartArtifact>, config: ReportConfig) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    let app = MetricsViewerApp::new(AppState::new(charts, config));
    eframe::run_native(
        "Rusty Metrics – Chart Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow!("viewer failed: {e}"))
}
