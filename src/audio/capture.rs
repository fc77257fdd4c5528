//! Microphone audio capture using cpal.
//!
//! Captures at the device's native sample rate and downsamples to the
//! pipeline's configured sample rate, emitting fixed-size `Frame`s sized to
//! `VAD_SIZE` milliseconds.

use crate::config::AudioConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::messages::Frame;
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Audio capture from the system microphone via cpal.
pub struct AudioCapture {
    device: cpal::Device,
    stream_config: StreamConfig,
    target_sample_rate: u32,
    frame_len: usize,
}

impl AudioCapture {
    /// Resolve the input device and its native stream configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AudioDeviceUnavailable`] if no usable input
    /// device exists — this is the one fatal-at-startup error in the crate.
    pub fn new(config: &AudioConfig, frame_len: usize) -> Result<Self> {
        let host = cpal::default_host();

        let device = if let Some(ref name) = config.input_device {
            let requested = host
                .input_devices()
                .map_err(|e| PipelineError::AudioDeviceUnavailable(format!("{e}")))?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false));

            match requested {
                Some(device) => device,
                None => {
                    warn!("configured input device '{name}' not found, using default");
                    host.default_input_device().ok_or_else(|| {
                        PipelineError::AudioDeviceUnavailable("no default input device".into())
                    })?
                }
            }
        } else {
            host.default_input_device().ok_or_else(|| {
                PipelineError::AudioDeviceUnavailable("no default input device".into())
            })?
        };

        let device_name = device.name().unwrap_or_else(|_| "<unknown>".into());
        info!("using input device: {device_name}");

        let default_config = device.default_input_config().map_err(|e| {
            PipelineError::AudioDeviceUnavailable(format!("no default input config: {e}"))
        })?;

        let native_rate = default_config.sample_rate();
        let native_channels = default_config.channels();

        let stream_config = StreamConfig {
            channels: native_channels,
            sample_rate: native_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        if native_rate.0 != config.sample_rate {
            info!(
                "will downsample input from {}Hz to {}Hz",
                native_rate.0, config.sample_rate
            );
        }

        Ok(Self {
            device,
            stream_config,
            target_sample_rate: config.sample_rate,
            frame_len: frame_len.max(1),
        })
    }

    /// Start capture and run until `cancel` fires, sending fixed-size frames
    /// to `tx` via non-blocking `try_send` (the audio callback never blocks).
    ///
    /// # Errors
    ///
    /// Returns an error if the input stream cannot be built or started.
    pub async fn run(&self, tx: mpsc::Sender<Frame>, cancel: CancellationToken) -> Result<()> {
        let native_rate = self.stream_config.sample_rate.0;
        let native_channels = self.stream_config.channels;
        let target_rate = self.target_sample_rate;
        let frame_len = self.frame_len;
        let tx_clone = tx.clone();
        let mut pending: VecDeque<f32> = VecDeque::with_capacity(frame_len * 4);

        let dropped = AtomicU64::new(0);
        let tx_closed = AtomicBool::new(false);

        let stream = self
            .device
            .build_input_stream(
                &self.stream_config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    let mono = if native_channels > 1 {
                        to_mono(data, native_channels)
                    } else {
                        data.to_vec()
                    };

                    let samples = if native_rate != target_rate {
                        downsample(&mono, native_rate, target_rate)
                    } else {
                        mono
                    };

                    pending.extend(samples);

                    while pending.len() >= frame_len {
                        if tx_closed.load(Ordering::Relaxed) {
                            pending.clear();
                            break;
                        }

                        let out: Vec<f32> = pending.drain(..frame_len).collect();
                        let frame = Frame {
                            samples: out,
                            sample_rate: target_rate,
                            captured_at: Instant::now(),
                        };

                        match tx_clone.try_send(frame) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                dropped.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => {
                                tx_closed.store(true, Ordering::Relaxed);
                            }
                        }
                    }
                },
                move |err| error!("audio input stream error: {err}"),
                None,
            )
            .map_err(|e| PipelineError::Audio(format!("failed to build input stream: {e}")))?;

        stream
            .play()
            .map_err(|e| PipelineError::Audio(format!("failed to start input stream: {e}")))?;

        info!("audio capture started: native {native_rate}Hz -> target {target_rate}Hz");

        cancel.cancelled().await;
        drop(stream);
        debug!("audio capture stopped");
        Ok(())
    }

    /// List available input device names.
    ///
    /// # Errors
    ///
    /// Returns an error if devices cannot be enumerated.
    pub fn list_input_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| PipelineError::Audio(format!("cannot enumerate devices: {e}")))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

fn to_mono(data: &[f32], channels: u16) -> Vec<f32> {
    let ch = channels as usize;
    data.chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Linear-interpolation downsampler. No anti-alias filter: speech energy
/// sits well below the Nyquist frequency of any target rate used here.
fn downsample(samples: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if src_rate == dst_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = src_rate as f64 / dst_rate as f64;
    let out_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            samples[idx] as f64 * (1.0 - frac) + samples[idx + 1] as f64 * frac
        } else {
            samples[idx.min(samples.len() - 1)] as f64
        };

        output.push(sample as f32);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downsample_is_identity_at_equal_rates() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(downsample(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn downsample_halves_length_at_half_rate() {
        let samples = vec![0.0; 1000];
        let out = downsample(&samples, 32_000, 16_000);
        assert_eq!(out.len(), 500);
    }

    #[test]
    fn to_mono_averages_stereo_channels() {
        let data = vec![1.0, -1.0, 0.5, 0.5];
        assert_eq!(to_mono(&data, 2), vec![0.0, 0.5]);
    }
}
