//! Error types for the conversational pipeline.

/// Top-level error type for the voice-assistant pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// No usable audio input/output device at startup. Fatal (process exit 1).
    #[error("audio device unavailable: {0}")]
    AudioDeviceUnavailable(String),

    /// Audio stream error after startup.
    #[error("audio error: {0}")]
    Audio(String),

    /// Voice activity detection error.
    #[error("VAD error: {0}")]
    Vad(String),

    /// Speech-to-text transcription error.
    #[error("ASR error: {0}")]
    Asr(String),

    /// Language model streaming error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Text-to-speech synthesis error.
    #[error("TTS error: {0}")]
    Tts(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Pipeline coordination error (e.g. `Coordinator::run` called twice).
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// Channel send/receive error between pipeline stages.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PipelineError>;
