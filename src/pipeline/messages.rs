//! Message types passed between pipeline stages.

use std::time::Instant;

/// A fixed-size chunk of raw audio samples from the microphone, emitted by
/// `AudioCapture` once per `VAD_SIZE` milliseconds.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Mono f32 samples at the configured sample rate.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// When this frame was captured.
    pub captured_at: Instant,
}

/// A `Frame` annotated with the VAD's voicing decision.
#[derive(Debug, Clone)]
pub struct VoicedFrame {
    /// The underlying audio frame.
    pub frame: Frame,
    /// Whether the frame was classified as voiced (`rms > VAD_THRESHOLD`).
    pub is_voiced: bool,
}

/// A complete utterance assembled by `UtteranceAssembler`, ready for ASR.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Concatenated samples, including pre-roll, for the entire utterance.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// When the first voiced frame of this utterance was captured.
    pub started_at: Instant,
}

/// The two roles a turn in the transcript can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

/// A single turn in the running conversation transcript.
#[derive(Debug, Clone)]
pub struct DialogueTurn {
    pub speaker: Speaker,
    pub text: String,
}

/// A single token emitted by the LLM during streaming generation.
#[derive(Debug, Clone)]
pub struct LlmToken {
    /// The decoded text fragment.
    pub text: String,
    /// Whether this was the last token in the response (stop condition hit).
    pub is_end: bool,
}

/// A sentence accumulated from LLM tokens and cleaned, ready for TTS.
#[derive(Debug, Clone)]
pub struct Sentence {
    /// Cleaned sentence text.
    pub text: String,
    /// Whether this is the last sentence in the current response.
    pub is_final: bool,
}

/// Synthesized audio from TTS, ready for playback.
#[derive(Debug, Clone)]
pub struct SpeechClip {
    /// f32 audio samples.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

/// High-level pipeline mode, used for logging and UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    /// Waiting for the user to start speaking.
    Listening,
    /// An utterance is being recorded.
    Recording,
    /// Waiting on the LLM / ASR.
    Thinking,
    /// Synthesizing or playing back assistant speech.
    Speaking,
}
