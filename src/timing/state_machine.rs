use tracing::{debug, info};

use super::{Player, Progress, Song};
use crate::audio::{SoundGenerator, midi_to_freq};
use crate::error::Result;
use crate::events::PlayerEvent;
use crate::loader::LoadedTrack;

/// Seconds a note sounds when the file gives no matching note-off.
pub const DEFAULT_NOTE_DURATION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    NoTrack,
    Stopped,
    Playing,
    Paused,
    Finished,
}

impl TransportState {
    pub fn has_track(self) -> bool {
        self != TransportState::NoTrack
    }
}

/// What the UI needs to draw the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub state: TransportState,
    pub track_name: Option<String>,
    /// Track name embedded in the MIDI file, if any.
    pub title: Option<String>,
    pub progress: Progress,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            state: TransportState::NoTrack,
            track_name: None,
            title: None,
            progress: Progress::default(),
        }
    }
}

/// Owns the player and the sound generator for the loaded track.
pub struct TransportController<S> {
    sound: S,
    player: Option<Player>,
    state: TransportState,
    track_name: Option<String>,
    title: Option<String>,
    progress: Progress,
}

impl<S: SoundGenerator> TransportController<S> {
    pub fn new(sound: S) -> Self {
        Self {
            sound,
            player: None,
            state: TransportState::NoTrack,
            track_name: None,
            title: None,
            progress: Progress::default(),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    #[cfg(test)]
    fn progress(&self) -> Progress {
        self.progress
    }

    #[cfg(test)]
    fn sound(&self) -> &S {
        &self.sound
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            track_name: self.track_name.clone(),
            title: self.title.clone(),
            progress: self.progress,
        }
    }

    /// Replaces the current session with a fresh one for `track`. The old
    /// session is torn down even when `track` fails to parse.
    pub fn load(&mut self, track: &LoadedTrack) -> Result<()> {
        self.teardown();

        let song = Song::parse(&track.bytes)?;
        info!(
            "Loaded {} ({}) from {}: {} notes, {:.1}s",
            track.name,
            track.mime,
            track.origin,
            song.note_count(),
            song.duration
        );

        self.progress = Progress::new(song.duration);
        self.track_name = Some(track.name.clone());
        self.title = song.name.clone();
        self.player = Some(Player::new(song));
        self.state = TransportState::Stopped;
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(mut player) = self.player.take() {
            player.stop();
            self.sound.release_all();
        }
        self.track_name = None;
        self.title = None;
        self.progress = Progress::default();
        self.state = TransportState::NoTrack;
    }

    pub fn play(&mut self) -> Result<()> {
        if matches!(
            self.state,
            TransportState::NoTrack | TransportState::Playing
        ) {
            return Ok(());
        }
        let Some(player) = self.player.as_mut() else {
            return Ok(());
        };

        if !self.sound.is_active() {
            info!("Starting audio output");
            self.sound.activate()?;
        }

        if self.state == TransportState::Finished {
            self.progress.reset();
        }
        player.play();
        self.state = TransportState::Playing;
        debug!("Transport: playing");
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }
        if let Some(player) = self.player.as_mut() {
            player.pause();
            debug!("Transport: paused, {:.1}s left", player.song_time_remaining());
        }
        self.state = TransportState::Paused;
    }

    pub fn stop(&mut self) {
        if !self.state.has_track() {
            return;
        }
        if let Some(player) = self.player.as_mut() {
            player.stop();
        }
        self.sound.release_all();
        self.progress.reset();
        self.state = TransportState::Stopped;
        debug!("Transport: stopped");
    }

    /// Advances playback by `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        if self.state != TransportState::Playing {
            return;
        }
        let events = match self.player.as_mut() {
            Some(player) => player.advance(dt),
            None => return,
        };
        for event in events {
            self.dispatch(event);
        }
    }

    pub fn dispatch(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::NoteOn {
                pitch,
                velocity,
                duration,
            } => {
                if self.state == TransportState::Playing {
                    let duration = duration.unwrap_or(DEFAULT_NOTE_DURATION);
                    self.sound
                        .trigger_attack_release(midi_to_freq(pitch), duration as f32, velocity);
                }
            }
            PlayerEvent::TimingTick { total, remaining } => {
                if self.state.has_track() {
                    self.progress.on_tick(total, remaining);
                }
            }
            PlayerEvent::EndOfSequence => {
                if self.state.has_track() {
                    self.state = TransportState::Finished;
                    self.progress.finish();
                    info!("Transport: finished");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::timing::test_support::tempo_change_song;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Activate,
        Trigger { freq: f32, duration: f32, velocity: u8 },
        ReleaseAll,
    }

    #[derive(Default)]
    struct RecordingSynth {
        calls: Vec<Call>,
        active: bool,
        fail_activation: bool,
    }

    impl RecordingSynth {
        fn releases(&self) -> usize {
            self.calls.iter().filter(|c| **c == Call::ReleaseAll).count()
        }

        fn triggers(&self) -> Vec<(f32, f32, u8)> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Trigger {
                        freq,
                        duration,
                        velocity,
                    } => Some((*freq, *duration, *velocity)),
                    _ => None,
                })
                .collect()
        }
    }

    impl SoundGenerator for RecordingSynth {
        fn activate(&mut self) -> Result<()> {
            if self.fail_activation {
                return Err(Error::NoOutputDevice);
            }
            self.active = true;
            self.calls.push(Call::Activate);
            Ok(())
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn trigger_attack_release(&mut self, freq: f32, duration: f32, velocity: u8) {
            self.calls.push(Call::Trigger {
                freq,
                duration,
                velocity,
            });
        }

        fn release_all(&mut self) {
            self.calls.push(Call::ReleaseAll);
        }
    }

    fn track() -> LoadedTrack {
        LoadedTrack::from_remote("track42.mid", tempo_change_song())
    }

    fn loaded() -> TransportController<RecordingSynth> {
        let mut transport = TransportController::new(RecordingSynth::default());
        transport.load(&track()).unwrap();
        transport
    }

    #[test]
    fn loading_enters_stopped_with_zero_progress() {
        let transport = loaded();
        let snapshot = transport.snapshot();
        assert_eq!(snapshot.state, TransportState::Stopped);
        assert_eq!(snapshot.track_name.as_deref(), Some("track42.mid"));
        assert_eq!(snapshot.title.as_deref(), Some("Lead"));
        assert_eq!(snapshot.progress.elapsed, 0.0);
        assert_eq!(snapshot.progress.percent, 0.0);
        assert!((snapshot.progress.total - 2.0).abs() < 1e-9);
    }

    #[test]
    fn play_activates_audio_once() {
        let mut transport = loaded();
        transport.play().unwrap();
        assert_eq!(transport.state(), TransportState::Playing);
        transport.pause();
        transport.play().unwrap();

        let activations = transport
            .sound()
            .calls
            .iter()
            .filter(|c| **c == Call::Activate)
            .count();
        assert_eq!(activations, 1);
    }

    #[test]
    fn play_is_noop_without_track_or_while_playing() {
        let mut transport = TransportController::new(RecordingSynth::default());
        transport.play().unwrap();
        assert_eq!(transport.state(), TransportState::NoTrack);
        assert!(transport.sound().calls.is_empty());

        let mut transport = loaded();
        transport.play().unwrap();
        transport.tick(0.6);
        let before = transport.snapshot();
        transport.play().unwrap();
        assert_eq!(transport.snapshot(), before);
    }

    #[test]
    fn failed_activation_leaves_state_unchanged() {
        let mut transport = TransportController::new(RecordingSynth {
            fail_activation: true,
            ..RecordingSynth::default()
        });
        transport.load(&track()).unwrap();

        assert!(matches!(transport.play(), Err(Error::NoOutputDevice)));
        assert_eq!(transport.state(), TransportState::Stopped);
    }

    #[test]
    fn pause_only_applies_while_playing() {
        let mut transport = loaded();
        transport.pause();
        assert_eq!(transport.state(), TransportState::Stopped);

        transport.play().unwrap();
        transport.tick(0.6);
        transport.pause();
        assert_eq!(transport.state(), TransportState::Paused);

        let progress = transport.progress();
        transport.tick(1.0);
        assert_eq!(transport.progress(), progress);

        transport.pause();
        assert_eq!(transport.state(), TransportState::Paused);
    }

    #[test]
    fn stop_without_track_changes_nothing() {
        let mut transport = TransportController::new(RecordingSynth::default());
        transport.stop();
        assert_eq!(transport.snapshot(), PlaybackSnapshot::default());
        assert!(transport.sound().calls.is_empty());
    }

    #[test]
    fn stop_releases_notes_and_resets_progress() {
        let mut transport = loaded();
        transport.play().unwrap();
        transport.tick(0.6);
        assert!(transport.progress().percent > 0.0);

        transport.stop();
        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.progress().elapsed, 0.0);
        assert_eq!(transport.progress().percent, 0.0);
        assert_eq!(transport.sound().releases(), 1);
    }

    #[test]
    fn note_events_sound_the_synth() {
        let mut transport = loaded();
        transport.play().unwrap();
        transport.tick(0.6);

        let triggers = transport.sound().triggers();
        assert_eq!(triggers.len(), 2);

        let (freq, duration, velocity) = triggers[0];
        assert!((freq - midi_to_freq(60)).abs() < 1e-3);
        assert!((duration - 0.5).abs() < 1e-6);
        assert_eq!(velocity, 100);

        let (freq, duration, _) = triggers[1];
        assert!((freq - midi_to_freq(64)).abs() < 1e-3);
        assert!((duration - 1.5).abs() < 1e-6);
    }

    #[test]
    fn unpaired_note_uses_default_duration() {
        let mut transport = loaded();
        transport.play().unwrap();
        transport.dispatch(PlayerEvent::NoteOn {
            pitch: 69,
            velocity: 90,
            duration: None,
        });

        let triggers = transport.sound().triggers();
        assert_eq!(triggers, vec![(midi_to_freq(69), 0.5, 90)]);
    }

    #[test]
    fn notes_are_ignored_unless_playing() {
        let mut transport = loaded();
        transport.dispatch(PlayerEvent::NoteOn {
            pitch: 69,
            velocity: 90,
            duration: Some(1.0),
        });
        assert!(transport.sound().triggers().is_empty());
    }

    #[test]
    fn timing_tick_updates_progress() {
        let mut transport = loaded();
        transport.dispatch(PlayerEvent::TimingTick {
            total: 120.0,
            remaining: 90.0,
        });
        assert_eq!(transport.progress().elapsed, 30.0);
        assert_eq!(transport.progress().percent, 25.0);

        transport.dispatch(PlayerEvent::TimingTick {
            total: 0.0,
            remaining: 0.0,
        });
        assert_eq!(transport.progress().percent, 0.0);
    }

    #[test]
    fn end_of_sequence_finishes_at_full_progress() {
        let mut transport = loaded();
        transport.play().unwrap();
        transport.tick(0.1);
        transport.dispatch(PlayerEvent::EndOfSequence);
        assert_eq!(transport.state(), TransportState::Finished);
        assert_eq!(transport.progress().percent, 100.0);

        let mut transport = loaded();
        transport.play().unwrap();
        transport.tick(10.0);
        assert_eq!(transport.state(), TransportState::Finished);
        assert_eq!(transport.progress().percent, 100.0);
    }

    #[test]
    fn play_after_finish_starts_over() {
        let mut transport = loaded();
        transport.play().unwrap();
        transport.tick(10.0);

        transport.play().unwrap();
        assert_eq!(transport.state(), TransportState::Playing);
        assert_eq!(transport.progress().percent, 0.0);
    }

    #[test]
    fn loading_while_playing_resets_the_session() {
        let mut transport = loaded();
        transport.play().unwrap();
        transport.tick(0.6);
        let releases = transport.sound().releases();

        transport.load(&track()).unwrap();
        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.progress().elapsed, 0.0);
        assert_eq!(transport.progress().percent, 0.0);
        assert_eq!(transport.sound().releases(), releases + 1);

        // the fresh player starts from the top
        transport.play().unwrap();
        transport.tick(0.0);
        let triggers = transport.sound().triggers();
        assert!((triggers.last().unwrap().0 - midi_to_freq(60)).abs() < 1e-3);
    }

    #[test]
    fn unreadable_track_tears_down_previous_session() {
        let mut transport = loaded();
        transport.play().unwrap();

        let broken = LoadedTrack::from_remote("broken.mid", b"garbage".to_vec());
        assert!(matches!(transport.load(&broken), Err(Error::Midi(_))));
        assert_eq!(transport.snapshot(), PlaybackSnapshot::default());
        assert_eq!(transport.sound().releases(), 1);
    }
}
