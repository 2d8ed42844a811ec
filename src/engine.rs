use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::audio::{PolySynth, SharedVolume, SoundGenerator};
use crate::config::Config;
use crate::loader::{LoadSequencer, LoadTicket, LoadedTrack};
use crate::timing::{PlaybackSnapshot, TransportController, TransportState};

#[derive(Debug, Clone)]
pub enum EngineCommand {
    LoadTrack { track: LoadedTrack, ticket: LoadTicket },
    Play,
    Pause,
    Stop,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineUpdate {
    Playback(PlaybackSnapshot),
    Error { message: String },
}

pub struct EngineHandle {
    pub command_tx: Sender<EngineCommand>,
    pub update_rx: Receiver<EngineUpdate>,
}

pub fn spawn_engine(config: &Config, loads: LoadSequencer, volume: SharedVolume) -> EngineHandle {
    let settings = config.synth.clone();
    spawn_engine_with(
        move || PolySynth::new(settings, volume),
        loads,
        config.tick_interval(),
    )
}

/// Runs the transport on its own thread. `make_sound` is called on that
/// thread, so the generator does not need to be `Send`.
pub fn spawn_engine_with<S, F>(make_sound: F, loads: LoadSequencer, tick: Duration) -> EngineHandle
where
    S: SoundGenerator + 'static,
    F: FnOnce() -> S + Send + 'static,
{
    let (command_tx, command_rx) = crossbeam::channel::unbounded();
    let (update_tx, update_rx) = crossbeam::channel::unbounded();

    std::thread::spawn(move || {
        let transport = TransportController::new(make_sound());
        engine_thread(transport, loads, tick, command_rx, update_tx);
    });

    EngineHandle {
        command_tx,
        update_rx,
    }
}

fn engine_thread<S: SoundGenerator>(
    mut transport: TransportController<S>,
    loads: LoadSequencer,
    tick: Duration,
    command_rx: Receiver<EngineCommand>,
    update_tx: Sender<EngineUpdate>,
) {
    let mut published = transport.snapshot();
    let _ = update_tx.send(EngineUpdate::Playback(published.clone()));
    let mut last_tick = Instant::now();

    loop {
        match command_rx.recv_timeout(tick) {
            Ok(EngineCommand::Shutdown) => break,
            Ok(command) => {
                let was_playing = transport.state() == TransportState::Playing;
                handle_command(&mut transport, &loads, command, &update_tx);
                if !was_playing && transport.state() == TransportState::Playing {
                    // don't count audio start-up time as playback
                    last_tick = Instant::now();
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        transport.tick(now.duration_since(last_tick).as_secs_f64());
        last_tick = now;

        let snapshot = transport.snapshot();
        if snapshot != published {
            let _ = update_tx.send(EngineUpdate::Playback(snapshot.clone()));
            published = snapshot;
        }
    }

    transport.stop();
    info!("Engine stopped");
}

fn handle_command<S: SoundGenerator>(
    transport: &mut TransportController<S>,
    loads: &LoadSequencer,
    command: EngineCommand,
    update_tx: &Sender<EngineUpdate>,
) {
    match command {
        EngineCommand::LoadTrack { track, ticket } => {
            if !loads.is_current(ticket) {
                info!("Discarding {}: a newer load superseded it", track.name);
                return;
            }
            if let Err(e) = transport.load(&track) {
                error!("Failed to load {}: {}", track.name, e);
                let _ = update_tx.send(EngineUpdate::Error {
                    message: format!("Failed to load {}: {}", track.name, e),
                });
            }
        }
        EngineCommand::Play => {
            if let Err(e) = transport.play() {
                error!("Failed to start audio: {}", e);
                let _ = update_tx.send(EngineUpdate::Error {
                    message: format!("Failed to start audio: {}", e),
                });
            }
        }
        EngineCommand::Pause => transport.pause(),
        EngineCommand::Stop => transport.stop(),
        EngineCommand::Shutdown => {}
    }
}
