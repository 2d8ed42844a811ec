use eframe::egui;

use crate::EngineCommand;
use crate::timing::{PlaybackSnapshot, TransportState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct ButtonStates {
    pub play: bool,
    pub pause: bool,
    pub stop: bool,
}

impl ButtonStates {
    pub fn for_state(state: TransportState) -> Self {
        Self {
            play: state.has_track() && state != TransportState::Playing,
            pause: state == TransportState::Playing,
            stop: state.has_track(),
        }
    }
}

/// Draws the progress bar and transport buttons. Returns the command for
/// whichever button was clicked.
pub(super) fn show(ui: &mut egui::Ui, playback: &PlaybackSnapshot) -> Option<EngineCommand> {
    let progress = &playback.progress;
    ui.add(egui::ProgressBar::new((progress.percent / 100.0) as f32).show_percentage());
    ui.horizontal(|ui| {
        ui.label(progress.elapsed_label());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(progress.total_label());
        });
    });

    let buttons = ButtonStates::for_state(playback.state);
    let mut command = None;
    ui.horizontal(|ui| {
        if ui
            .add_enabled(buttons.play, egui::Button::new("▶ Play"))
            .clicked()
        {
            command = Some(EngineCommand::Play);
        }
        if ui
            .add_enabled(buttons.pause, egui::Button::new("⏸ Pause"))
            .clicked()
        {
            command = Some(EngineCommand::Pause);
        }
        if ui
            .add_enabled(buttons.stop, egui::Button::new("⏹ Stop"))
            .clicked()
        {
            command = Some(EngineCommand::Stop);
        }
    });
    command
}
