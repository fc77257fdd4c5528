//! Audio playback to system speakers via cpal, with a barge-in monitor.

use crate::config::AudioConfig;
use crate::error::{PipelineError, Result};
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Outcome of a single `Playback::play` call.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackOutcome {
    /// Whether `speak_permitted` went false before playback finished.
    pub interrupted: bool,
    /// Fraction of the clip actually heard, in `[0.0, 1.0]`.
    pub played_fraction: f32,
}

/// Audio playback to system speakers via cpal.
pub struct Playback {
    device: cpal::Device,
    stream_config: StreamConfig,
}

impl Playback {
    /// # Errors
    ///
    /// Returns [`PipelineError::AudioDeviceUnavailable`] if no usable output
    /// device exists.
    pub fn new(config: &AudioConfig, sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = if let Some(ref name) = config.output_device {
            host.output_devices()
                .map_err(|e| PipelineError::AudioDeviceUnavailable(format!("{e}")))?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or_else(|| {
                    PipelineError::AudioDeviceUnavailable(format!("output device '{name}' not found"))
                })?
        } else {
            host.default_output_device().ok_or_else(|| {
                PipelineError::AudioDeviceUnavailable("no default output device".into())
            })?
        };

        let device_name = device.name().unwrap_or_else(|_| "<unknown>".into());
        info!("using output device: {device_name}");

        let stream_config = StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            device,
            stream_config,
        })
    }

    /// Play `samples` through the output device, polling `speak_permitted`
    /// every `pause_time_ms` and stopping playback as soon as it goes false.
    ///
    /// Blocks the calling thread until playback finishes or is interrupted —
    /// callers run this on a dedicated playback thread, not the async
    /// runtime, matching the rest of the pipeline's thread-per-stage model.
    ///
    /// # Errors
    ///
    /// Returns an error if the output stream cannot be created or started.
    pub fn play(
        &mut self,
        samples: &[f32],
        speak_permitted: &Arc<AtomicBool>,
        pause_time_ms: u32,
    ) -> Result<PlaybackOutcome> {
        if samples.is_empty() {
            return Ok(PlaybackOutcome {
                interrupted: false,
                played_fraction: 1.0,
            });
        }

        let buffer = Arc::new(Mutex::new(PlaybackBuffer {
            samples: samples.to_vec(),
            position: 0,
            finished: false,
        }));
        let buffer_clone = Arc::clone(&buffer);

        let stream = self
            .device
            .build_output_stream(
                &self.stream_config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    let Ok(mut buf) = buffer_clone.lock() else {
                        return;
                    };
                    for sample in data.iter_mut() {
                        if buf.position < buf.samples.len() {
                            *sample = buf.samples[buf.position];
                            buf.position += 1;
                        } else {
                            *sample = 0.0;
                            buf.finished = true;
                        }
                    }
                },
                move |err| error!("audio output stream error: {err}"),
                None,
            )
            .map_err(|e| PipelineError::Audio(format!("failed to build output stream: {e}")))?;

        stream
            .play()
            .map_err(|e| PipelineError::Audio(format!("failed to start output stream: {e}")))?;

        let start = Instant::now();
        let total = samples.len();
        let rate = self.stream_config.sample_rate.0 as f32;
        let poll = Duration::from_millis(pause_time_ms.max(1) as u64);

        let outcome = loop {
            std::thread::sleep(poll);

            let finished = buffer
                .lock()
                .map_err(|e| PipelineError::Audio(format!("playback buffer lock poisoned: {e}")))?
                .finished;
            if finished {
                break PlaybackOutcome {
                    interrupted: false,
                    played_fraction: 1.0,
                };
            }

            if !speak_permitted.load(Ordering::SeqCst) {
                let elapsed = start.elapsed().as_secs_f32() + 0.12;
                let played = (elapsed * rate) as usize;
                let played_fraction = (played as f32 / total as f32).min(1.0);
                break PlaybackOutcome {
                    interrupted: true,
                    played_fraction,
                };
            }
        };

        drop(stream);
        Ok(outcome)
    }

    /// List available output device names.
    ///
    /// # Errors
    ///
    /// Returns an error if devices cannot be enumerated.
    pub fn list_output_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| PipelineError::Audio(format!("cannot enumerate devices: {e}")))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

struct PlaybackBuffer {
    samples: Vec<f32>,
    position: usize,
    finished: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_clip_is_never_interrupted() {
        let mut playback = match Playback::new(&AudioConfig::default(), 24_000) {
            Ok(p) => p,
            Err(_) => return, // no audio device in this environment
        };
        let flag = Arc::new(AtomicBool::new(true));
        let outcome = playback.play(&[], &flag, 100).unwrap();
        assert!(!outcome.interrupted);
        assert_eq!(outcome.played_fraction, 1.0);
    }
}
