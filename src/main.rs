//! Desktop entry point for the video download queue

// Window state and rendering
mod app;
use app::{Shell, ShellApp};

// eframe/egui for GUI application framework
use eframe::egui::{self, Visuals};
use std::sync::Arc;
use video_queue::{
    ConfigStore, DownloadQueue, Downloader, Logger, QueueWorker, Settings, event_channel,
    logging::init_tracing,
};

/// Program entry point: loads config, starts the worker and launches the GUI
fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let settings = Settings::default();

    // Persisted download folder, shared read-only with the worker
    let config = Arc::new(ConfigStore::open(&settings.config_file)?);

    // Daily log file plus the on-screen buffer; fall back to screen-only
    let logger = match Logger::with_log_dir(&settings.log_dir) {
        Ok(logger) => logger,
        Err(e) => {
            tracing::warn!(error = %e, "log file unavailable, logging to window only");
            Logger::new()
        }
    };

    // Queue, event channel and the single background worker
    let queue = DownloadQueue::new();
    let (relay, events) = event_channel();
    let worker = QueueWorker::new(
        queue.clone(),
        Downloader::default(),
        config.clone(),
        relay.clone(),
    )
    .with_timing(settings.poll_interval, settings.task_pause)
    .spawn()?;

    let shell = Shell::new(
        queue,
        config,
        logger,
        events,
        Some(worker),
        settings.shutdown_timeout,
    );

    // Configure window size and title
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Video Downloader")
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Video Downloader",
        options,
        Box::new(move |cc| {
            // Use dark theme visuals
            cc.egui_ctx.set_visuals(Visuals::dark());
            // Repaint as soon as the worker reports something
            let ctx = cc.egui_ctx.clone();
            relay.set_waker(move || ctx.request_repaint());
            Box::new(ShellApp::new(shell))
        }),
    )?;

    Ok(())
}
