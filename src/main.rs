#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

mod app;
mod config;
mod export;
mod geometry;
mod loader;
mod store;
mod surface;

use eframe::egui;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::EditorConfig::load_or_default();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Stencil Editor")
            .with_inner_size([880.0, 780.0])
            .with_min_inner_size([360.0, 420.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "Stencil Editor",
        options,
        Box::new(|cc| Ok(Box::new(app::StencilEditorApp::new(cc, config)))),
    )
}
