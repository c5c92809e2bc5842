#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // Hide console on release

mod app;
mod config;
mod filesystem;
mod filter;
mod format;
mod navigation;
mod sizing;
mod sort;

use app::{start_location, FileManagerApp};
use config::AppConfig;
use eframe::egui;
use std::path::PathBuf;

fn main() -> eframe::Result<()> {
    env_logger::init(); // Log to console

    let config = AppConfig::load();
    let start = start_location(std::env::args_os().nth(1).map(PathBuf::from), &config);
    log::info!("Starting at {}", start.label());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_title("File Manager"),
        ..Default::default()
    };

    eframe::run_native(
        "File Manager",
        options,
        Box::new(move |cc| Ok(Box::new(FileManagerApp::new(cc, start, config)))),
    )
}
