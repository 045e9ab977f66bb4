// Disable console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod map;

use app::CampusMapApp;
use eframe::egui;

fn main() -> eframe::Result<()> {
    env_logger::init(); // Initialize logging

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("campusmap - Lesson Locations"),
        ..Default::default()
    };

    eframe::run_native(
        "campusmap",
        native_options,
        Box::new(|cc| Ok(Box::new(CampusMapApp::new(cc)))),
    )
}
