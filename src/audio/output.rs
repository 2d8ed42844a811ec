use arc_swap::ArcSwap;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    HeapProd, HeapRb,
    traits::{Consumer, Producer, Split},
};
use std::sync::Arc;
use tracing::{info, warn};

use super::{SoundGenerator, SynthCommand, VoiceBank};
use crate::config::SynthConfig;
use crate::error::{Error, Result};

const COMMAND_QUEUE_SIZE: usize = 1024;

/// Master volume shared between the UI and the audio callback.
pub type SharedVolume = Arc<ArcSwap<f32>>;

/// Sound generator backed by the default `cpal` output device.
///
/// The output stream is opened lazily by [`SoundGenerator::activate`]; until
/// then note requests are dropped.
pub struct PolySynth {
    settings: SynthConfig,
    volume: SharedVolume,
    producer: Option<HeapProd<SynthCommand>>,
    stream: Option<cpal::Stream>,
}

impl PolySynth {
    pub fn new(settings: SynthConfig, volume: SharedVolume) -> Self {
        Self {
            settings,
            volume,
            producer: None,
            stream: None,
        }
    }

    fn send(&mut self, command: SynthCommand) {
        if let Some(producer) = self.producer.as_mut() {
            if producer.try_push(command).is_err() {
                warn!("Synth command queue is full, dropping {:?}", command);
            }
        }
    }
}

/// Fills interleaved `data` with `channels` copies of each rendered sample.
fn render_frames(bank: &mut VoiceBank, data: &mut [f32], channels: usize, sample_rate: f32, gain: f32) {
    for frame in data.chunks_mut(channels) {
        let sample = bank.render_sample(sample_rate) * gain;
        frame.fill(sample);
    }
}

impl SoundGenerator for PolySynth {
    fn activate(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(Error::NoOutputDevice)?;
        let config = device.default_output_config()?;
        let stream_config: cpal::StreamConfig = config.into();
        let num_channels = (stream_config.channels as usize).max(1);
        // voices must advance at the rate the device consumes frames
        let sample_rate = stream_config.sample_rate as f32;

        let (producer, mut consumer) = HeapRb::<SynthCommand>::new(COMMAND_QUEUE_SIZE).split();
        let mut bank = VoiceBank::new(
            self.settings.wave,
            self.settings.adsr.clone(),
            self.settings.max_voices,
        );
        let volume = self.volume.clone();

        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                while let Some(command) = consumer.try_pop() {
                    bank.apply(command);
                }
                render_frames(&mut bank, data, num_channels, sample_rate, **volume.load());
            },
            |err| tracing::error!("Audio stream error: {}", err),
            None,
        )?;
        stream.play()?;

        info!(
            "Audio output: {} channels, {} Hz",
            num_channels, stream_config.sample_rate
        );

        self.producer = Some(producer);
        self.stream = Some(stream);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    fn trigger_attack_release(&mut self, freq: f32, duration: f32, velocity: u8) {
        self.send(SynthCommand::TriggerAttackRelease {
            freq,
            duration,
            velocity,
        });
    }

    fn release_all(&mut self) {
        self.send(SynthCommand::ReleaseAll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{ADSRConfig, Wave};

    fn sustained_bank() -> VoiceBank {
        let adsr = ADSRConfig {
            attack: 0.0,
            decay: 0.0,
            sustain: 1.0,
            release: 0.0,
        };
        let mut bank = VoiceBank::new(Wave::Sine, adsr, 4);
        bank.trigger(440.0, 10.0, 127);
        bank
    }

    fn rising_crossings(samples: &[f32]) -> usize {
        samples
            .windows(2)
            .filter(|pair| pair[0] < 0.0 && pair[1] >= 0.0)
            .count()
    }

    #[test]
    fn pitch_holds_at_the_device_rate() {
        for device_rate in [44_100usize, 48_000, 96_000] {
            let mut bank = sustained_bank();
            let mut data = vec![0.0; device_rate];
            render_frames(&mut bank, &mut data, 1, device_rate as f32, 1.0);

            let cycles = rising_crossings(&data);
            assert!(
                (438..=442).contains(&cycles),
                "{} cycles per second at {} Hz",
                cycles,
                device_rate
            );
        }
    }

    #[test]
    fn every_channel_gets_the_same_scaled_sample() {
        let mut bank = sustained_bank();
        let mut data = vec![0.0; 64];
        render_frames(&mut bank, &mut data, 2, 48_000.0, 0.5);

        for frame in data.chunks(2) {
            assert_eq!(frame[0], frame[1]);
            assert!(frame[0].abs() <= 0.5);
        }
        assert!(data.iter().any(|s| *s != 0.0));
    }
}
