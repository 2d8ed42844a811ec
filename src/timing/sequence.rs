use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::{HashMap, VecDeque};

use crate::error::Result;

/// Tempo assumed until the file sets one: 120 BPM.
const DEFAULT_MICROS_PER_QUARTER: f64 = 500_000.0;

#[derive(Debug, Clone, PartialEq)]
pub enum SongEventKind {
    NoteOn {
        pitch: u8,
        velocity: u8,
        duration: Option<f64>,
    },
    NoteOff {
        pitch: u8,
    },
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongEvent {
    /// Seconds from the start of the song
    pub at: f64,
    pub kind: SongEventKind,
}

/// A MIDI file flattened into a single time-ordered list of events, with
/// every track merged and ticks converted to seconds.
#[derive(Debug, Clone, Default)]
pub struct Song {
    pub name: Option<String>,
    pub events: Vec<SongEvent>,
    /// Seconds, time of the last event
    pub duration: f64,
}

enum RawKind {
    Tempo(u32),
    Note { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8 },
    Other,
}

struct RawEvent {
    tick: u64,
    kind: RawKind,
}

impl Song {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let smf = Smf::parse(bytes)?;

        let mut name = None;
        let mut raw_events = Vec::new();
        for track in &smf.tracks {
            let mut tick: u64 = 0;
            for event in track {
                tick += event.delta.as_int() as u64;
                let kind = match event.kind {
                    TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => RawKind::Tempo(tempo.as_int()),
                    TrackEventKind::Meta(MetaMessage::TrackName(text)) => {
                        if name.is_none() && !text.is_empty() {
                            name = Some(String::from_utf8_lossy(text).into_owned());
                        }
                        RawKind::Other
                    }
                    TrackEventKind::Midi { channel, message } => match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => RawKind::Note {
                            channel: channel.as_int(),
                            key: key.as_int(),
                            velocity: vel.as_int(),
                        },
                        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                            RawKind::NoteOff {
                                channel: channel.as_int(),
                                key: key.as_int(),
                            }
                        }
                        _ => RawKind::Other,
                    },
                    _ => RawKind::Other,
                };
                raw_events.push(RawEvent { tick, kind });
            }
        }

        // stable, so events sharing a tick keep their track order
        raw_events.sort_by_key(|e| e.tick);

        let mut clock = TickClock::new(smf.header.timing);
        let mut events: Vec<SongEvent> = Vec::with_capacity(raw_events.len());
        let mut open_notes: HashMap<(u8, u8), VecDeque<usize>> = HashMap::new();

        for raw in raw_events {
            let at = clock.seconds_at(raw.tick);
            let kind = match raw.kind {
                RawKind::Tempo(micros) => {
                    clock.set_tempo(micros);
                    SongEventKind::Other
                }
                RawKind::Note {
                    channel,
                    key,
                    velocity,
                } => {
                    open_notes
                        .entry((channel, key))
                        .or_default()
                        .push_back(events.len());
                    SongEventKind::NoteOn {
                        pitch: key,
                        velocity,
                        duration: None,
                    }
                }
                RawKind::NoteOff { channel, key } => {
                    let opened = open_notes
                        .get_mut(&(channel, key))
                        .and_then(|queue| queue.pop_front());
                    if let Some(idx) = opened {
                        let start = events[idx].at;
                        if let SongEventKind::NoteOn { duration, .. } = &mut events[idx].kind {
                            *duration = Some(at - start);
                        }
                    }
                    SongEventKind::NoteOff { pitch: key }
                }
                RawKind::Other => SongEventKind::Other,
            };
            events.push(SongEvent { at, kind });
        }

        let duration = events.last().map_or(0.0, |e| e.at);

        Ok(Self {
            name,
            events,
            duration,
        })
    }

    pub fn note_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, SongEventKind::NoteOn { .. }))
            .count()
    }
}

/// Converts absolute ticks to seconds, following tempo changes.
struct TickClock {
    timing: Timing,
    micros_per_quarter: f64,
    last_tick: u64,
    seconds: f64,
}

impl TickClock {
    fn new(timing: Timing) -> Self {
        Self {
            timing,
            micros_per_quarter: DEFAULT_MICROS_PER_QUARTER,
            last_tick: 0,
            seconds: 0.0,
        }
    }

    fn seconds_per_tick(&self) -> f64 {
        match self.timing {
            Timing::Metrical(ticks_per_beat) => {
                let ticks_per_beat = ticks_per_beat.as_int().max(1) as f64;
                self.micros_per_quarter / 1_000_000.0 / ticks_per_beat
            }
            Timing::Timecode(fps, ticks_per_frame) => {
                1.0 / (fps.as_f32() as f64 * ticks_per_frame.max(1) as f64)
            }
        }
    }

    fn seconds_at(&mut self, tick: u64) -> f64 {
        self.seconds += (tick - self.last_tick) as f64 * self.seconds_per_tick();
        self.last_tick = tick;
        self.seconds
    }

    fn set_tempo(&mut self, micros_per_quarter: u32) {
        if micros_per_quarter > 0 {
            self.micros_per_quarter = micros_per_quarter as f64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::timing::test_support::{smf_bytes, tempo_change_song};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn notes(song: &Song) -> Vec<(f64, u8, Option<f64>)> {
        song.events
            .iter()
            .filter_map(|e| match e.kind {
                SongEventKind::NoteOn {
                    pitch, duration, ..
                } => Some((e.at, pitch, duration)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn merges_tracks_and_follows_tempo_changes() {
        let song = Song::parse(&tempo_change_song()).unwrap();

        let notes = notes(&song);
        assert_eq!(notes.len(), 3);

        assert!(approx(notes[0].0, 0.0));
        assert_eq!(notes[0].1, 60);
        assert!(approx(notes[0].2.unwrap(), 0.5));

        assert!(approx(notes[1].0, 0.5));
        assert_eq!(notes[1].1, 64);
        assert!(approx(notes[1].2.unwrap(), 1.5));

        assert!(approx(notes[2].0, 2.0));
        assert_eq!(notes[2].1, 67);
        assert_eq!(notes[2].2, None);

        assert!(approx(song.duration, 2.0));
        assert_eq!(song.name.as_deref(), Some("Lead"));
        assert!(song.events.windows(2).all(|w| w[0].at <= w[1].at));
    }

    #[test]
    fn zero_velocity_note_on_is_a_note_off() {
        let song = Song::parse(&tempo_change_song()).unwrap();
        let offs = song
            .events
            .iter()
            .filter(|e| matches!(e.kind, SongEventKind::NoteOff { pitch: 64 }))
            .count();
        assert_eq!(offs, 1);
        assert_eq!(song.note_count(), 3);
    }

    #[test]
    fn timecode_division_uses_frame_rate() {
        // 25 fps, 40 ticks per frame: 1000 ticks per second
        let track: &[u8] = &[
            0x00, 0x90, 0x45, 0x60, // A4 on
            0x64, 0x80, 0x45, 0x00, // off after 100 ticks
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let song = Song::parse(&smf_bytes(0, 0xE728, &[track])).unwrap();
        let notes = notes(&song);
        assert_eq!(notes.len(), 1);
        assert!(approx(notes[0].2.unwrap(), 0.1));
        assert!(approx(song.duration, 0.1));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(Song::parse(b"not a midi file"), Err(Error::Midi(_))));
    }

    #[test]
    fn empty_track_has_zero_duration() {
        let track: &[u8] = &[0x00, 0xFF, 0x2F, 0x00];
        let song = Song::parse(&smf_bytes(0, 480, &[track])).unwrap();
        assert_eq!(song.duration, 0.0);
        assert_eq!(song.note_count(), 0);
    }
}
