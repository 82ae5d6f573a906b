//! Webpanim GUI — egui-based tool for turning PNG sequences into
//! animated WebP files.

mod app;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([600.0, 700.0])
            .with_min_inner_size([480.0, 520.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Webpanim",
        options,
        Box::new(|cc| Ok(Box::new(app::WebpanimApp::new(cc)))),
    )
}
