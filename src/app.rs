//! Window state and rendering for the download queue.

use std::sync::Arc;
use std::time::Duration;

use eframe::{App, Frame, egui};
use rfd::FileDialog;

use video_queue::{
    ConfigStore, DownloadQueue, EventReceiver, Logger, StatusEvent, WorkerHandle, WorkerState,
    relay::coalesce_progress,
};

/// In-flight download shown under the status line
struct ActiveDownload {
    url: String,
    progress: f32,
}

/// UI-thread state, independent of egui so it can be driven from tests
pub struct Shell {
    /// Input field for the next URL
    pub url_input: String,
    queue: DownloadQueue,
    config: Arc<ConfigStore>,
    logger: Logger,
    events: EventReceiver,
    worker: Option<WorkerHandle>,
    shutdown_timeout: Duration,
    active: Option<ActiveDownload>,
    was_focused: bool,
}

impl Shell {
    pub fn new(
        queue: DownloadQueue,
        config: Arc<ConfigStore>,
        logger: Logger,
        events: EventReceiver,
        worker: Option<WorkerHandle>,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            url_input: String::new(),
            queue,
            config,
            logger,
            events,
            worker,
            shutdown_timeout,
            active: None,
            was_focused: true,
        }
    }

    fn log(&mut self, message: &str) {
        self.logger.log(message);
    }

    /// Queue whatever is in the URL field.
    pub fn submit(&mut self) {
        let input = self.url_input.trim().to_owned();
        if self.queue.enqueue(&input) {
            self.log(&format!("Added to download queue: {input}"));
            self.url_input.clear();
        }
    }

    /// Persist a newly picked download folder.
    pub fn set_folder(&mut self, folder: &str) {
        match self.config.set_target_path(folder) {
            Ok(()) => self.log(&format!("Download folder set to: {folder}")),
            Err(e) => {
                tracing::error!(error = %e, "failed to save config");
                self.log(&format!("Could not save download folder: {e}"));
            }
        }
    }

    pub fn target_path(&self) -> String {
        self.config.target_path()
    }

    /// Track window focus; regaining it re-reads the config file, which may
    /// have been edited while the window was in the background.
    pub fn focus_changed(&mut self, focused: bool) {
        if focused && !self.was_focused {
            self.reload_config();
        }
        self.was_focused = focused;
    }

    fn reload_config(&mut self) {
        let before = self.config.target_path();
        match self.config.reload() {
            Ok(()) => {
                let after = self.config.target_path();
                if after != before {
                    self.log(&format!("Download folder reloaded: {after}"));
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to reload config");
                self.log(&format!("Could not reload config: {e}"));
            }
        }
    }

    /// Apply every pending worker event, in order.
    pub fn pump_events(&mut self) {
        for event in coalesce_progress(self.events.drain()) {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: StatusEvent) {
        match event {
            StatusEvent::LogMessage(message) => self.log(&message),
            StatusEvent::Started(url) => {
                self.log(&format!("Downloading: {url}"));
                self.active = Some(ActiveDownload { url, progress: 0.0 });
            }
            StatusEvent::Progress { url, fraction } => {
                if let Some(active) = self.active.as_mut().filter(|a| a.url == url) {
                    active.progress = active.progress.max(fraction);
                }
            }
            StatusEvent::Completed(url) => {
                self.log(&format!("Download completed successfully: {url}"));
                self.active = None;
            }
            StatusEvent::Failed { url, error } => {
                self.log(&format!("Download failed for {url}: {error}"));
                self.active = None;
            }
        }
    }

    pub fn status_text(&self) -> String {
        let pending = self.queue.len();
        let busy = self
            .worker
            .as_ref()
            .is_some_and(|w| w.state() == WorkerState::Processing);
        match (pending, busy) {
            (0, false) => "Ready to download".to_owned(),
            (0, true) => "Processing download...".to_owned(),
            (n, _) => format!("Downloads in queue: {n}"),
        }
    }

    /// Lines currently visible in the log panel, oldest first.
    pub fn visible_lines(&self) -> Vec<String> {
        self.logger.recent().get_lines()
    }

    /// Empty the on-screen buffer; the log file is untouched.
    pub fn clear_log_display(&mut self) {
        self.logger.recent().lock().clear();
        self.log("Log display cleared by user");
    }

    /// Stop the worker and flush the log.
    pub fn shutdown(&mut self) {
        let Some(mut worker) = self.worker.take() else {
            return;
        };
        self.log("Shutting down application...");
        if !worker.shutdown(self.shutdown_timeout) {
            self.log("Download still running at exit; it will be abandoned");
        }
        self.pump_events();
        self.logger.flush();
    }
}

/// eframe wrapper around [`Shell`]
pub struct ShellApp {
    shell: Shell,
}

impl ShellApp {
    pub fn new(shell: Shell) -> Self {
        Self { shell }
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for ShellApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // 1️⃣ Apply worker events on the UI thread
        self.shell
            .focus_changed(ctx.input(|i| i.viewport().focused.unwrap_or(true)));
        self.shell.pump_events();

        egui::CentralPanel::default().show(ctx, |ui| {
            // 2️⃣ Download folder row
            ui.horizontal(|ui| {
                ui.label("Download Path:");
                let path = self.shell.target_path();
                ui.monospace(&path);
                if ui.button("Browse...").clicked() {
                    let mut dialog = FileDialog::new();
                    if !path.is_empty() {
                        dialog = dialog.set_directory(&path);
                    }
                    if let Some(folder) = dialog.pick_folder() {
                        self.shell.set_folder(&folder.display().to_string());
                    }
                }
            });

            // 3️⃣ URL input; Enter or the button queues it
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.shell.url_input)
                        .hint_text("Enter or paste URL here")
                        .desired_width(ui.available_width() - 90.0),
                );
                let entered =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Download").clicked() || entered {
                    self.shell.submit();
                    response.request_focus();
                }
            });

            // 4️⃣ Queue status and progress of the current download
            ui.label(self.shell.status_text());
            if let Some(active) = &self.shell.active {
                ui.label(&active.url);
                ui.add(egui::ProgressBar::new(active.progress).show_percentage());
            }

            ui.separator();

            // 5️⃣ Log panel
            ui.horizontal(|ui| {
                ui.label("Log Output (Last 10 Lines):");
                if ui.button("Clear").clicked() {
                    self.shell.clear_log_display();
                }
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for line in self.shell.visible_lines() {
                        ui.monospace(line);
                    }
                });
        });

        // Queue depth changes without events, so keep polling
        ctx.request_repaint_after(Duration::from_millis(250));
    }

    /// Window is closing: stop the worker before the event loop goes away
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.shell.shutdown();
    }
}
