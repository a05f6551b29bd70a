//! Real audio output over cpal.
//!
//! The control thread never touches the voice set directly: commands
//! travel over a lock-free ring buffer and are applied by the audio
//! callback at block boundaries. The callback publishes its frame
//! counter and voice counts through atomics so the control side can
//! read the clock without locking.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Producer, RingBuffer};

use super::mixer::{Mixer, MixerCommand};
use super::{AudioBackend, ClockState};
use crate::error::AudioError;
use crate::voice::{Bus, VoiceSpec};
use crate::MAX_BLOCK_SIZE;

const COMMAND_QUEUE_SIZE: usize = 256;

/// Counters published by the audio callback.
struct Telemetry {
    frames: AtomicU64,
    melody_voices: AtomicUsize,
    effect_voices: AtomicUsize,
}

pub struct CpalBackend {
    tx: Producer<MixerCommand>,
    telemetry: Arc<Telemetry>,
    sample_rate: f32,
    state: ClockState,
    // Keeps the output stream alive; dropping it stops audio.
    stream: cpal::Stream,
}

impl CpalBackend {
    /// Open the default output device. The stream starts paused - the
    /// clock reports Suspended until the first successful resume, which
    /// mirrors platform autoplay rules.
    pub fn open() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        let (tx, mut rx) = RingBuffer::<MixerCommand>::new(COMMAND_QUEUE_SIZE);
        let telemetry = Arc::new(Telemetry {
            frames: AtomicU64::new(0),
            melody_voices: AtomicUsize::new(0),
            effect_voices: AtomicUsize::new(0),
        });

        let shared = telemetry.clone();
        let mut mixer = Mixer::new(sample_rate);
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _| {
                    while let Ok(command) = rx.pop() {
                        mixer.apply(command);
                    }

                    let total_frames = data.len() / channels;
                    let mut frames_written = 0;
                    while frames_written < total_frames {
                        let n = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                        let block = &mut render_buf[..n];
                        mixer.render(block);

                        // Mono to all channels
                        let out_off = frames_written * channels;
                        for (i, &s) in block.iter().enumerate() {
                            for ch in 0..channels {
                                data[out_off + i * channels + ch] = s;
                            }
                        }
                        frames_written += n;
                    }

                    shared.frames.store(mixer.frames(), Ordering::Release);
                    shared
                        .melody_voices
                        .store(mixer.active(Bus::Melody), Ordering::Release);
                    shared
                        .effect_voices
                        .store(mixer.active(Bus::Effect), Ordering::Release);
                },
                |err| log::error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        stream
            .pause()
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        Ok(Self {
            tx,
            telemetry,
            sample_rate,
            state: ClockState::Suspended,
            stream,
        })
    }

    fn push(&mut self, command: MixerCommand) {
        // A full queue means the audio thread is hopelessly behind;
        // dropping the command is the least-bad option.
        if self.tx.push(command).is_err() {
            log::warn!("audio command queue full; dropping command");
        }
    }
}

impl AudioBackend for CpalBackend {
    fn now(&self) -> f64 {
        self.telemetry.frames.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn state(&self) -> ClockState {
        self.state
    }

    fn request_resume(&mut self) -> bool {
        if self.state == ClockState::Closed {
            return false;
        }
        match self.stream.play() {
            Ok(()) => {
                self.state = ClockState::Running;
                true
            }
            Err(e) => {
                log::warn!("failed to resume audio stream: {e}");
                false
            }
        }
    }

    fn suspend(&mut self) {
        if self.state == ClockState::Closed {
            return;
        }
        if let Err(e) = self.stream.pause() {
            log::warn!("failed to suspend audio stream: {e}");
            return;
        }
        self.state = ClockState::Suspended;
    }

    fn close(&mut self) {
        if let Err(e) = self.stream.pause() {
            log::debug!("pausing stream during close failed: {e}");
        }
        self.state = ClockState::Closed;
    }

    fn spawn_voice(&mut self, spec: VoiceSpec) {
        self.push(MixerCommand::Spawn(spec));
    }

    fn silence(&mut self, bus: Bus, fade_secs: f32) {
        self.push(MixerCommand::Silence { bus, fade_secs });
    }

    fn active_voices(&self, bus: Bus) -> usize {
        match bus {
            Bus::Melody => self.telemetry.melody_voices.load(Ordering::Acquire),
            Bus::Effect => self.telemetry.effect_voices.load(Ordering::Acquire),
        }
    }

    fn set_melody_gain(&mut self, gain: f32) {
        self.push(MixerCommand::MelodyGain(gain));
    }

    fn set_master_gain(&mut self, gain: f32) {
        self.push(MixerCommand::MasterGain(gain));
    }
}
