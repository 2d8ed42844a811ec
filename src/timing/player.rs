use super::{Song, SongEventKind};
use crate::events::PlayerEvent;

/// Walks a [`Song`] against a clock advanced by the caller.
pub struct Player {
    song: Song,
    position: f64,
    cursor: usize,
    running: bool,
}

impl Player {
    pub fn new(song: Song) -> Self {
        Self {
            song,
            position: 0.0,
            cursor: 0,
            running: false,
        }
    }

    /// Total song length in seconds.
    pub fn song_time(&self) -> f64 {
        self.song.duration
    }

    pub fn song_time_remaining(&self) -> f64 {
        (self.song.duration - self.position).max(0.0)
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.song.events.len()
    }

    /// Starts or resumes. A player that reached the end starts over.
    pub fn play(&mut self) {
        if self.is_finished() {
            self.rewind();
        }
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.rewind();
    }

    fn rewind(&mut self) {
        self.position = 0.0;
        self.cursor = 0;
    }

    /// Moves the clock forward by `dt` seconds and returns every event that
    /// became due, ending with [`PlayerEvent::EndOfSequence`] once the last
    /// file event has passed.
    pub fn advance(&mut self, dt: f64) -> Vec<PlayerEvent> {
        let mut out = Vec::new();
        if !self.running {
            return out;
        }

        self.position += dt.max(0.0);
        let total = self.song_time();

        while let Some(event) = self.song.events.get(self.cursor) {
            if event.at > self.position {
                break;
            }
            self.cursor += 1;

            if let SongEventKind::NoteOn {
                pitch,
                velocity,
                duration,
            } = event.kind
            {
                out.push(PlayerEvent::NoteOn {
                    pitch,
                    velocity,
                    duration,
                });
            }
            out.push(PlayerEvent::TimingTick {
                total,
                remaining: (total - event.at).max(0.0),
            });
        }

        if self.is_finished() {
            self.running = false;
            self.position = total;
            out.push(PlayerEvent::EndOfSequence);
        }

        out
    }
}
