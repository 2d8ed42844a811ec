use serde::{Deserialize, Serialize};

use super::Wave;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ADSRConfig {
    /// Seconds
    pub attack: f32,
    /// Seconds
    pub decay: f32,
    /// 0.0 -> 1.0
    pub sustain: f32,
    /// Seconds
    pub release: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeState {
    Attack { time: f32 },
    Decay { time: f32 },
    Sustain,
    Release { time: f32, from: f32 },
}

/// A single sounding note: oscillator phase, envelope, and the time left
/// before it is released.
#[derive(Debug, Clone)]
pub struct Voice {
    pub freq: f32,
    pub velocity: f32,
    pub phase: f32,
    pub envelope_state: EnvelopeState,
    pub envelope_level: f32,
    /// Seconds until the voice enters its release stage
    pub hold: f32,
}

impl Voice {
    pub fn new(freq: f32, velocity: u8, hold: f32) -> Self {
        Self {
            freq,
            velocity: velocity as f32 / 127.0,
            phase: 0.0,
            envelope_state: EnvelopeState::Attack { time: 0.0 },
            envelope_level: 0.0,
            hold: hold.max(0.0),
        }
    }

    pub fn release(&mut self) {
        if !matches!(self.envelope_state, EnvelopeState::Release { .. }) {
            self.envelope_state = EnvelopeState::Release {
                time: 0.0,
                from: self.envelope_level,
            };
        }
    }

    pub fn is_finished(&self, adsr: &ADSRConfig) -> bool {
        matches!(self.envelope_state, EnvelopeState::Release { time, .. } if time >= adsr.release)
    }

    pub fn render_sample(&mut self, wave: Wave, adsr: &ADSRConfig, sample_rate: f32) -> f32 {
        let sample = wave.sample(self.phase) * self.envelope_level * self.velocity;

        self.phase += self.freq / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        let dt = 1.0 / sample_rate;
        if !matches!(self.envelope_state, EnvelopeState::Release { .. }) {
            self.hold -= dt;
            if self.hold <= 0.0 {
                self.release();
            }
        }
        advance_envelope(self, adsr, dt);

        sample
    }
}

pub fn calculate_envelope(state: &EnvelopeState, adsr: &ADSRConfig) -> f32 {
    match state {
        EnvelopeState::Attack { time } => {
            if adsr.attack == 0.0 {
                1.0
            } else {
                (time / adsr.attack).min(1.0)
            }
        }
        EnvelopeState::Decay { time } => {
            let decay_progress = if adsr.decay == 0.0 {
                1.0
            } else {
                (time / adsr.decay).min(1.0)
            };
            1.0 - (1.0 - adsr.sustain) * decay_progress
        }
        EnvelopeState::Sustain => adsr.sustain,
        EnvelopeState::Release { time, from } => {
            let release_progress = if adsr.release == 0.0 {
                1.0
            } else {
                (time / adsr.release).min(1.0)
            };
            from * (1.0 - release_progress)
        }
    }
}

fn advance_envelope(voice: &mut Voice, adsr: &ADSRConfig, dt: f32) {
    match &mut voice.envelope_state {
        EnvelopeState::Attack { time } => {
            *time += dt;
            if *time >= adsr.attack {
                voice.envelope_state = EnvelopeState::Decay { time: 0.0 };
                voice.envelope_level = 1.0;
                return;
            }
        }
        EnvelopeState::Decay { time } => {
            *time += dt;
            if *time >= adsr.decay {
                voice.envelope_state = EnvelopeState::Sustain;
            }
        }
        EnvelopeState::Sustain => {}
        EnvelopeState::Release { time, .. } => {
            *time += dt;
        }
    }
    voice.envelope_level = calculate_envelope(&voice.envelope_state, adsr);
}
