use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use eframe::egui;

use crate::config::ReportConfig;
use crate::pipeline::Report;
use crate::render::ChartArtifact;

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

/// The full viewer state, independent of rendering.
pub struct AppState {
    /// Charts available for display, in list order.
    pub charts: Vec<ChartArtifact>,

    /// Index into `charts` of the chart on screen.
    pub selected: Option<usize>,

    /// Decoded PNGs keyed by path.
    textures: HashMap<PathBuf, egui::TextureHandle>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Draw comparison charts with egui_plot instead of the PNG.
    pub show_interactive: bool,

    /// Show the numbers behind a comparison chart.
    pub show_values: bool,

    /// Used when re-running comparisons from the viewer.
    pub config: ReportConfig,
}

impl AppState {
    pub fn new(charts: Vec<ChartArtifact>, config: ReportConfig) -> Self {
        let selected = (!charts.is_empty()).then_some(0);
        Self {
            charts,
            selected,
            textures: HashMap::new(),
            status_message: None,
            show_interactive: false,
            show_values: false,
            config,
        }
    }

    pub fn selected_chart(&self) -> Option<&ChartArtifact> {
        self.selected.and_then(|i| self.charts.get(i))
    }

    pub fn select(&mut self, index: usize) {
        if index < self.charts.len() {
            self.selected = Some(index);
        }
    }

    /// Replace all charts, e.g. after opening another folder.
    pub fn set_charts(&mut self, charts: Vec<ChartArtifact>) {
        self.selected = (!charts.is_empty()).then_some(0);
        self.charts = charts;
        self.textures.clear();
        self.status_message = None;
    }

    /// Fold a fresh report in: charts written to an existing path replace
    /// the old entry, new ones are appended and the first is selected.
    pub fn add_report(&mut self, report: Report) {
        let mut first_new = None;
        for artifact in report.artifacts {
            self.textures.remove(&artifact.path);
            let index = match self.charts.iter().position(|c| c.path == artifact.path) {
                Some(i) => {
                    self.charts[i] = artifact;
                    i
                }
                None => {
                    self.charts.push(artifact);
                    self.charts.len() - 1
                }
            };
            first_new.get_or_insert(index);
        }
        if let Some(i) = first_new {
            self.selected = Some(i);
        }

        self.status_message = if report.failed {
            Some("Some charts failed; see the log".to_string())
        } else if !report.skipped.is_empty() {
            Some(format!("Skipped: {}", report.skipped.join(", ")))
        } else {
            None
        };
    }

    /// Texture for the PNG at `path`, decoding it on first use.
    pub fn texture(&mut self, ctx: &egui::Context, path: &Path) -> Option<egui::TextureHandle> {
        if let Some(handle) = self.textures.get(path) {
            return Some(handle.clone());
        }
        match load_color_image(path) {
            Ok(image) => {
                let handle = ctx.load_texture(
                    path.display().to_string(),
                    image,
                    egui::TextureOptions::LINEAR,
                );
                self.textures.insert(path.to_path_buf(), handle.clone());
                Some(handle)
            }
            Err(e) => {
                log::error!("Failed to load chart: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                None
            }
        }
    }
}

/// Decode a PNG into an egui image.
pub fn load_color_image(path: &Path) -> Result<egui::ColorImage> {
    let image = image::open(path)
        .with_context(|| format!("decoding {}", path.display()))?
        .to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(
        size,
        image.as_flat_samples().as_slice(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::scratch_dir;
    use crate::render::ChartKind;

    fn artifact(name: &str) -> ChartArtifact {
        ChartArtifact::new(name, PathBuf::from(format!("/charts/{name}.png")), ChartKind::Stored)
    }

    #[test]
    fn first_chart_is_selected() {
        let state = AppState::new(vec![artifact("a"), artifact("b")], ReportConfig::default());
        assert_eq!(state.selected_chart().map(|c| c.title.as_str()), Some("a"));
        let empty = AppState::new(Vec::new(), ReportConfig::default());
        assert!(empty.selected_chart().is_none());
    }

    #[test]
    fn select_ignores_out_of_range() {
        let mut state = AppState::new(vec![artifact("a")], ReportConfig::default());
        state.select(3);
        assert_eq!(state.selected, Some(0));
    }

    #[test]
    fn report_replaces_charts_at_same_path() {
        let mut state = AppState::new(vec![artifact("a"), artifact("b")], ReportConfig::default());
        let mut updated = artifact("b");
        updated.title = "b again".into();
        state.add_report(Report {
            artifacts: vec![updated, artifact("c")],
            skipped: vec!["FLOPs".into()],
            failed: false,
        });

        let titles: Vec<&str> = state.charts.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b again", "c"]);
        assert_eq!(state.selected, Some(1));
        assert_eq!(state.status_message.as_deref(), Some("Skipped: FLOPs"));
    }

    #[test]
    fn png_decodes_to_color_image() {
        let dir = scratch_dir("state_png");
        let path = dir.join("tiny.png");
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        let img = load_color_image(&path).unwrap();
        assert_eq!(img.size, [3, 2]);
        assert_eq!(img.pixels[0], egui::Color32::from_rgb(10, 20, 30));
        assert!(load_color_image(&dir.join("missing.png")).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
