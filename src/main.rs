mod app;
mod cache;
mod color;
mod config;
mod data;
mod error;
mod state;
mod ui;

use app::FluxoApp;
use config::{SourceConfig, WINDOW_MIN_SIZE, WINDOW_SIZE, WINDOW_TITLE};
use data::fetch::HttpFetcher;
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let config = SourceConfig::default();
    let fetcher = match HttpFetcher::new(&config) {
        Ok(f) => f,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(WINDOW_SIZE)
            .with_min_inner_size(WINDOW_MIN_SIZE),
        ..Default::default()
    };

    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(|_cc| {
            let state = AppState::new(config, Box::new(fetcher));
            Ok(Box::new(FluxoApp::new(state)))
        }),
    )
}
