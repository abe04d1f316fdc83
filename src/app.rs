use eframe::egui;

use crate::config::WINDOW_TITLE;
use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct FluxoApp {
    pub state: AppState,
}

impl FluxoApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for FluxoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Blocks the first frame until the catalog is in.
        self.state.start();

        // ---- Top panel: toolbar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: selectboxes ----
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Bottom panel: raw data sample ----
        egui::TopBottomPanel::bottom("raw_preview")
            .resizable(true)
            .show(ctx, |ui| {
                panels::raw_preview(ui, &self.state);
            });

        // ---- Central panel: title, caption, chart ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(WINDOW_TITLE);
            if let Some(caption) = self.state.caption() {
                ui.weak(caption);
            }
            ui.separator();
            plot::flow_chart(ui, &self.state);
        });
    }
}
