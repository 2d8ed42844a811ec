use super::{ADSRConfig, Voice, Wave};

/// Messages from the engine thread to the audio callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SynthCommand {
    TriggerAttackRelease {
        freq: f32,
        /// Seconds
        duration: f32,
        velocity: u8,
    },
    ReleaseAll,
}

/// Polyphonic voice pool rendered inside the audio callback.
pub struct VoiceBank {
    voices: Vec<Voice>,
    wave: Wave,
    adsr: ADSRConfig,
    max_voices: usize,
}

impl VoiceBank {
    pub fn new(wave: Wave, adsr: ADSRConfig, max_voices: usize) -> Self {
        let max_voices = max_voices.max(1);
        Self {
            voices: Vec::with_capacity(max_voices),
            wave,
            adsr,
            max_voices,
        }
    }

    pub fn apply(&mut self, command: SynthCommand) {
        match command {
            SynthCommand::TriggerAttackRelease {
                freq,
                duration,
                velocity,
            } => self.trigger(freq, duration, velocity),
            SynthCommand::ReleaseAll => self.release_all(),
        }
    }

    pub fn trigger(&mut self, freq: f32, duration: f32, velocity: u8) {
        if self.voices.len() >= self.max_voices {
            // steal the oldest voice
            self.voices.remove(0);
        }
        self.voices.push(Voice::new(freq, velocity, duration));
    }

    pub fn release_all(&mut self) {
        for voice in &mut self.voices {
            voice.release();
        }
    }

    #[cfg(test)]
    fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn render_sample(&mut self, sample_rate: f32) -> f32 {
        let mut out = 0.0;
        for voice in &mut self.voices {
            out += voice.render_sample(self.wave, &self.adsr, sample_rate);
        }
        let adsr = &self.adsr;
        self.voices.retain(|voice| !voice.is_finished(adsr));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(max_voices: usize) -> VoiceBank {
        VoiceBank::new(
            Wave::Square,
            ADSRConfig {
                attack: 0.0,
                decay: 0.0,
                sustain: 1.0,
                release: 0.01,
            },
            max_voices,
        )
    }

    #[test]
    fn triggered_note_is_audible_then_released() {
        let mut bank = bank(4);
        bank.apply(SynthCommand::TriggerAttackRelease {
            freq: 100.0,
            duration: 0.02,
            velocity: 127,
        });
        assert_eq!(bank.active_voices(), 1);

        let peak = (0..10)
            .map(|_| bank.render_sample(1000.0).abs())
            .fold(0.0_f32, f32::max);
        assert!(peak > 0.5);

        for _ in 0..40 {
            bank.render_sample(1000.0);
        }
        assert_eq!(bank.active_voices(), 0);
    }

    #[test]
    fn release_all_silences_every_voice() {
        let mut bank = bank(8);
        for pitch in [220.0, 330.0, 440.0] {
            bank.trigger(pitch, 10.0, 100);
        }
        bank.render_sample(1000.0);
        bank.apply(SynthCommand::ReleaseAll);

        for _ in 0..20 {
            bank.render_sample(1000.0);
        }
        assert_eq!(bank.active_voices(), 0);
        assert_eq!(bank.render_sample(1000.0), 0.0);
    }

    #[test]
    fn oldest_voice_is_stolen_when_full() {
        let mut bank = bank(2);
        bank.trigger(100.0, 1.0, 100);
        bank.trigger(200.0, 1.0, 100);
        bank.trigger(300.0, 1.0, 100);
        assert_eq!(bank.active_voices(), 2);
        assert_eq!(bank.voices[0].freq, 200.0);
        assert_eq!(bank.voices[1].freq, 300.0);
    }
}
