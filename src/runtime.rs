//! Runtime events emitted by the pipeline for observability.
//!
//! Intentionally lightweight so the pipeline can emit events without
//! blocking the audio or LLM-streaming paths.

use crate::pipeline::messages::{PipelineMode, Sentence};

/// Events that describe what the pipeline is doing right now.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// The pipeline transitioned to a new mode (listening/recording/etc).
    ModeChanged(PipelineMode),
    /// A user utterance was transcribed and accepted.
    UserTranscript(String),
    /// An assistant sentence was produced by the LLM and queued for speech.
    AssistantSentence(Sentence),
    /// Playback of an assistant response was interrupted by barge-in.
    Interrupted { played_fraction: f32 },
}
