#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // Hide console in release

mod api;
mod app_list;
mod config;
mod lua_parser;
mod manifest;
mod ui;
mod vdf_patch;

use ui::PatcherApp;

#[tokio::main]
async fn main() -> Result<(), eframe::Error> {
    let logger_env = env_logger::Env::new()
        .filter_or("DEPOT_PATCHER_LOG", "info")
        .write_style("DEPOT_PATCHER_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    // Load Icon
    let icon_data = if let Ok(img) = image::open("icon.ico") {
        let img = img.to_rgba8();
        Some(eframe::egui::IconData {
            rgba: img.as_raw().to_vec(),
            width: img.width(),
            height: img.height(),
        })
    } else {
        None
    };

    let viewport = eframe::egui::ViewportBuilder::default()
        .with_inner_size([720.0, 560.0])
        .with_min_inner_size([640.0, 460.0])
        .with_resizable(true)
        .with_title("Depot Patcher");

    let viewport = if let Some(icon) = icon_data {
        viewport.with_icon(icon)
    } else {
        viewport
    };

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Depot Patcher",
        options,
        Box::new(|cc| Ok(Box::new(PatcherApp::new(cc)))),
    )
}
