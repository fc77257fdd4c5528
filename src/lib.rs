//! interlocutor: a real-time conversational voice-assistant pipeline.
//!
//! Audio in, speech out, with barge-in: the user can interrupt the
//! assistant mid-sentence and the pipeline stops speaking immediately.
//!
//! # Architecture
//!
//! Six stages connected by bounded channels, each on its own thread:
//! - **AudioCapture**: records from the microphone via `cpal`
//! - **VADGate**: per-frame voicing decision (RMS energy by default)
//! - **UtteranceAssembler**: turns voiced frames into complete utterances
//! - **ASRStage**: transcribes utterances, filters hallucinations and gates
//!   on a wake word
//! - **DialogueManager + LLMStreamer**: render the transcript into a
//!   chat-template prompt and stream a response sentence by sentence
//! - **SpeechSynthesizer + Playback**: speaks each sentence, polling a
//!   shared `speak_permitted` flag so the user can interrupt

pub mod audio;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod runtime;
pub mod stt;
pub mod tts;
pub mod vad;
pub mod wakeword;

pub use config::Config;
pub use error::{PipelineError, Result};
pub use pipeline::Coordinator;
