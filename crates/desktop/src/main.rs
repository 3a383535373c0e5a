//! Chatter Desktop: application entry.

use eframe::egui;

mod app;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 640.0])
            .with_min_inner_size([420.0, 360.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Chatter",
        options,
        Box::new(|cc| Box::new(app::ChatterApp::new(cc))),
    )
}
