//! Wires the six pipeline stages together and drives them until shutdown.
//!
//! Frame capture, VAD, and utterance assembly run continuously on one task
//! so that a new utterance (the user talking over the assistant) can be
//! detected — and clear `speak_permitted` — even while a previous turn's
//! LLM-streaming/TTS/playback is still in flight on the main task. The two
//! tasks share only `speak_permitted` and the utterance channel between
//! them; no other pipeline state is shared.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::audio::capture::AudioCapture;
use crate::audio::playback::Playback;
use crate::config::Config;
use crate::dialogue::DialogueManager;
use crate::error::{PipelineError, Result};
use crate::llm::LlmStreamer;
use crate::pipeline::assembler::UtteranceAssembler;
use crate::pipeline::messages::{Frame, PipelineMode, Sentence, Utterance, VoicedFrame};
use crate::runtime::RuntimeEvent;
use crate::stt::AsrStage;
use crate::tts::SpeechSynthesizer;
use crate::vad::VoiceActivityDetector;

/// Owns every stage and the shared barge-in flag.
pub struct Coordinator {
    config: Config,
    vad: Option<Box<dyn VoiceActivityDetector>>,
    asr: AsrStage,
    dialogue: DialogueManager,
    llm: LlmStreamer,
    tts: Box<dyn SpeechSynthesizer>,
    speak_permitted: Arc<AtomicBool>,
    events: Option<mpsc::UnboundedSender<RuntimeEvent>>,
}

impl Coordinator {
    pub fn new(
        config: Config,
        vad: Box<dyn VoiceActivityDetector>,
        asr: AsrStage,
        llm: LlmStreamer,
        tts: Box<dyn SpeechSynthesizer>,
    ) -> Self {
        let dialogue = DialogueManager::new(&config.llm);
        Self {
            config,
            vad: Some(vad),
            asr,
            dialogue,
            llm,
            tts,
            speak_permitted: Arc::new(AtomicBool::new(true)),
            events: None,
        }
    }

    /// Subscribe to runtime events (UI/observability). Only the most recent
    /// subscriber receives events.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<RuntimeEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    fn emit(&self, event: RuntimeEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Run the pipeline until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Fails only if the audio input or output device cannot be opened at
    /// startup (the one fatal error kind in the crate), or if the VAD was
    /// already consumed by a previous call to `run`.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        let vad = self
            .vad
            .take()
            .ok_or_else(|| PipelineError::Pipeline("run() called more than once".into()))?;

        let frame_len = self
            .config
            .vad
            .frame_samples(self.config.audio.sample_rate);
        let capture = AudioCapture::new(&self.config.audio, frame_len)?;
        let mut playback = Playback::new(&self.config.audio, self.tts.sample_rate())?;

        let (frame_tx, frame_rx) = mpsc::channel::<Frame>(self.config.audio.channel_capacity);
        let capture_cancel = shutdown.clone();
        let capture_task = tokio::spawn(async move { capture.run(frame_tx, capture_cancel).await });

        let (utterance_tx, mut utterance_rx) = mpsc::channel::<Utterance>(4);
        let assembler_handle = spawn_assembler(
            vad,
            self.config.vad.clone(),
            self.config.audio.sample_rate,
            Arc::clone(&self.speak_permitted),
            frame_rx,
            utterance_tx,
            shutdown.clone(),
        );

        self.emit(RuntimeEvent::ModeChanged(PipelineMode::Listening));

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                maybe_utterance = utterance_rx.recv() => {
                    let Some(utterance) = maybe_utterance else { break };
                    self.emit(RuntimeEvent::ModeChanged(PipelineMode::Thinking));
                    if let Err(e) = self.handle_utterance(utterance, &mut playback).await {
                        warn!("turn processing failed: {e}");
                    }
                    self.emit(RuntimeEvent::ModeChanged(PipelineMode::Listening));
                }
            }
        }

        shutdown.cancel();
        let _ = capture_task.await;
        let _ = assembler_handle.await;
        Ok(())
    }

    async fn handle_utterance(&mut self, utterance: Utterance, playback: &mut Playback) -> Result<()> {
        let text = match self.asr.process(&utterance.samples, utterance.sample_rate)? {
            Some(text) => text,
            None => return Ok(()),
        };

        info!(text = %text, "accepted user turn");
        self.emit(RuntimeEvent::UserTranscript(text.clone()));
        self.dialogue.accept_user_turn(text);
        self.speak_permitted.store(true, Ordering::SeqCst);

        let sentences = self
            .llm
            .generate(self.dialogue.transcript(), &self.speak_permitted)
            .await?;
        if sentences.is_empty() {
            return Ok(());
        }

        self.emit(RuntimeEvent::ModeChanged(PipelineMode::Speaking));

        let mut spoken = Vec::with_capacity(sentences.len());
        let mut interrupted_fraction = None;

        for sentence in &sentences {
            if !self.speak_permitted.load(Ordering::SeqCst) {
                break;
            }

            self.emit(RuntimeEvent::AssistantSentence(Sentence {
                text: sentence.clone(),
                is_final: false,
            }));

            let audio = self.tts.generate_speech_audio(sentence)?;
            let outcome = playback.play(&audio, &self.speak_permitted, self.config.vad.pause_time_ms)?;
            spoken.push(sentence.clone());

            if outcome.interrupted {
                interrupted_fraction = Some(outcome.played_fraction);
                break;
            }
        }

        if let Some(fraction) = interrupted_fraction {
            self.emit(RuntimeEvent::Interrupted {
                played_fraction: fraction,
            });
            if let Some(last) = spoken.last_mut() {
                let clipped = clip_sentence(last, fraction);
                *last = format!("{clipped}<INTERRUPTED>");
            }
        }

        self.dialogue.commit_assistant_turn(&spoken);
        Ok(())
    }
}

/// Frame-consuming task: VAD scoring + utterance assembly. Runs
/// independently of turn processing so a new utterance can start (and
/// clear `speak_permitted`) while the assistant is still speaking.
fn spawn_assembler(
    mut vad: Box<dyn VoiceActivityDetector>,
    vad_config: crate::config::VadConfig,
    sample_rate: u32,
    speak_permitted: Arc<AtomicBool>,
    mut frame_rx: mpsc::Receiver<Frame>,
    utterance_tx: mpsc::Sender<Utterance>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut assembler = UtteranceAssembler::new(&vad_config, sample_rate);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                maybe_frame = frame_rx.recv() => {
                    let Some(frame) = maybe_frame else { break };
                    let score = vad.process_chunk(&frame);
                    let voiced = VoicedFrame { frame, is_voiced: score > vad_config.vad_threshold };
                    if let Some(utterance) = assembler.push(voiced, &speak_permitted) {
                        if utterance_tx.send(utterance).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    })
}

/// Clip `sentence` to the fraction of words that were heard before
/// playback was interrupted.
fn clip_sentence(sentence: &str, played_fraction: f32) -> String {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    if words.is_empty() {
        return String::new();
    }
    let percentage = (played_fraction * 100.0).min(100.0);
    let keep = ((percentage / 100.0) * words.len() as f32).round() as usize;
    words[..keep.min(words.len())].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_sentence_keeps_proportional_word_count() {
        let clipped = clip_sentence("one two three four", 0.5);
        assert_eq!(clipped, "one two");
    }

    #[test]
    fn clip_sentence_handles_full_playback() {
        let clipped = clip_sentence("one two three four", 1.0);
        assert_eq!(clipped, "one two three four");
    }

    #[test]
    fn clip_sentence_of_empty_text_is_empty() {
        assert_eq!(clip_sentence("", 0.5), "");
    }
}
