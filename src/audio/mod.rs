mod instrument;
mod output;
mod synth;
mod voice;

pub use instrument::Wave;
pub use output::{PolySynth, SharedVolume};
pub use synth::{SynthCommand, VoiceBank};
pub use voice::{ADSRConfig, EnvelopeState, Voice};

use crate::error::Result;

pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Something that turns note requests into sound.
pub trait SoundGenerator {
    /// Readies the audio output. Only the first successful call does any
    /// work; later calls return `Ok(())` immediately.
    fn activate(&mut self) -> Result<()>;

    fn is_active(&self) -> bool;

    /// Sounds `freq` Hz for `duration` seconds.
    fn trigger_attack_release(&mut self, freq: f32, duration: f32, velocity: u8);

    /// Releases every sounding note.
    fn release_all(&mut self);
}
