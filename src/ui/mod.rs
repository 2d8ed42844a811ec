mod transport;

use crate::audio::SharedVolume;
use crate::loader::{LoadSequencer, LoadedTrack, MIDI_EXTENSIONS};
use crate::remote::{BridgeCommand, BridgeHandle, BridgeUpdate};
use crate::timing::{PlaybackSnapshot, TransportState};
use crate::{EngineCommand, EngineHandle, EngineUpdate};
use eframe::egui;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

const MAX_LOG_LINES: usize = 200;
const ACTIVE_REPAINT: Duration = Duration::from_millis(33);
/// Keeps engine and bridge updates flowing while nothing moves on screen.
const IDLE_REPAINT: Duration = Duration::from_millis(250);

fn repaint_interval(playback: &PlaybackSnapshot, downloading: bool) -> Duration {
    if playback.state == TransportState::Playing || downloading {
        ACTIVE_REPAINT
    } else {
        IDLE_REPAINT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connection {
    Connecting,
    Connected,
    Disconnected,
}

pub struct ComposerApp {
    engine: EngineHandle,
    bridge: BridgeHandle,
    loads: LoadSequencer,
    volume: SharedVolume,
    volume_value: f32,
    playback: PlaybackSnapshot,
    connection: Connection,
    pending_download: Option<String>,
    error_message: Option<String>,
    logs: VecDeque<String>,
}

impl ComposerApp {
    pub fn new(
        engine: EngineHandle,
        bridge: BridgeHandle,
        loads: LoadSequencer,
        volume: SharedVolume,
    ) -> Self {
        let volume_value = **volume.load();
        Self {
            engine,
            bridge,
            loads,
            volume,
            volume_value,
            playback: PlaybackSnapshot::default(),
            connection: Connection::Connecting,
            pending_download: None,
            error_message: None,
            logs: VecDeque::new(),
        }
    }

    fn push_log(&mut self, line: String) {
        if self.logs.len() == MAX_LOG_LINES {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    fn process_engine_updates(&mut self) {
        while let Ok(update) = self.engine.update_rx.try_recv() {
            match update {
                EngineUpdate::Playback(snapshot) => {
                    if snapshot.track_name != self.playback.track_name {
                        self.error_message = None;
                    }
                    self.playback = snapshot;
                }
                EngineUpdate::Error { message } => {
                    self.push_log(message.clone());
                    self.error_message = Some(message);
                }
            }
        }
    }

    fn process_bridge_updates(&mut self) {
        while let Ok(update) = self.bridge.update_rx.try_recv() {
            match update {
                BridgeUpdate::Connected => self.connection = Connection::Connected,
                BridgeUpdate::Disconnected => {
                    self.connection = Connection::Disconnected;
                    self.pending_download = None;
                }
                BridgeUpdate::ServerLog(line) => self.push_log(format!("server: {}", line)),
                BridgeUpdate::Downloading(name) => {
                    self.push_log(format!("downloading {}", name));
                    self.pending_download = Some(name);
                }
                BridgeUpdate::Downloaded(name) => {
                    self.push_log(format!("received {}", name));
                    self.pending_download = None;
                }
                BridgeUpdate::Error(message) => {
                    self.push_log(message.clone());
                    self.pending_download = None;
                    self.error_message = Some(message);
                }
            }
        }
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.engine.command_tx.send(command);
    }

    fn generate(&mut self) {
        if self.bridge.command_tx.send(BridgeCommand::Generate).is_ok() {
            self.push_log("sending generate music request".to_string());
        }
    }

    fn open_file(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Open MIDI file")
            .add_filter("MIDI", MIDI_EXTENSIONS)
            .pick_file()
        else {
            return;
        };

        match LoadedTrack::from_path(&path) {
            Ok(track) => {
                let ticket = self.loads.issue();
                self.send(EngineCommand::LoadTrack { track, ticket });
            }
            Err(e) => {
                error!("Failed to open {}: {}", path.display(), e);
                self.error_message = Some(e.to_string());
            }
        }
    }

    fn header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let can_generate = self.connection == Connection::Connected;
            if ui
                .add_enabled(can_generate, egui::Button::new("🎵 Generate Music"))
                .clicked()
            {
                self.generate();
            }

            if ui.button("📂 Open .mid...").clicked() {
                self.open_file();
            }

            ui.separator();
            let (label, color) = match self.connection {
                Connection::Connecting => ("connecting...", egui::Color32::YELLOW),
                Connection::Connected => ("connected", egui::Color32::from_rgb(60, 180, 100)),
                Connection::Disconnected => ("disconnected", egui::Color32::RED),
            };
            ui.colored_label(color, label);

            if let Some(name) = &self.pending_download {
                ui.spinner();
                ui.label(format!("downloading {}", name));
            }
        });
    }

    fn volume_control(&mut self, ui: &mut egui::Ui) {
        let response = ui.add(egui::Slider::new(&mut self.volume_value, 0.0..=1.0).text("Volume"));
        if response.changed() {
            self.volume.store(Arc::new(self.volume_value));
        }
    }

    fn log_panel(&self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &self.logs {
                    ui.monospace(line);
                }
            });
    }
}

impl eframe::App for ComposerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_engine_updates();
        self.process_bridge_updates();

        if let Some(ref error) = self.error_message {
            egui::TopBottomPanel::top("error").show(ctx, |ui| {
                ui.colored_label(egui::Color32::RED, error);
            });
        }

        egui::TopBottomPanel::bottom("logs")
            .resizable(true)
            .min_height(120.0)
            .show(ctx, |ui| {
                ui.label("Log");
                self.log_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("LSTM Based Music Model");
            });
            ui.add_space(12.0);
            self.header(ui);
            ui.separator();

            match (&self.playback.track_name, &self.playback.title) {
                (Some(name), Some(title)) => ui.label(format!("Track: {} ({})", name, title)),
                (Some(name), None) => ui.label(format!("Track: {}", name)),
                (None, _) => ui.label("No track loaded"),
            };
            ui.add_space(8.0);

            if let Some(command) = transport::show(ui, &self.playback) {
                self.send(command);
            }
            ui.add_space(8.0);
            self.volume_control(ui);
        });

        ctx.request_repaint_after(repaint_interval(
            &self.playback,
            self.pending_download.is_some(),
        ));
    }
}

impl Drop for ComposerApp {
    fn drop(&mut self) {
        let _ = self.bridge.command_tx.send(BridgeCommand::Shutdown);
        let _ = self.engine.command_tx.send(EngineCommand::Shutdown);
    }
}
