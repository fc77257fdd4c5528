//! Configuration types for the conversational pipeline.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Audio capture/playback settings.
    pub audio: AudioConfig,
    /// Voice activity detection settings.
    pub vad: VadConfig,
    /// Speech-to-text settings.
    pub stt: SttConfig,
    /// Language model settings.
    pub llm: LlmConfig,
    /// Text-to-speech settings.
    pub tts: TtsConfig,
    /// Conversation gate settings (wake word).
    pub conversation: ConversationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            vad: VadConfig::default(),
            stt: SttConfig::default(),
            llm: LlmConfig::default(),
            tts: TtsConfig::default(),
            conversation: ConversationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, merged over defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| crate::error::PipelineError::Config(format!("{}: {e}", path.display())))
    }
}

/// Audio I/O configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Pipeline sample rate in Hz (`SAMPLE_RATE`). Both capture and TTS
    /// playback run at this rate; no separate output rate is modeled.
    pub sample_rate: u32,
    /// Input device name (None = system default).
    pub input_device: Option<String>,
    /// Output device name (None = system default).
    pub output_device: Option<String>,
    /// Bounded channel capacity between capture and the VAD gate.
    pub channel_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            input_device: None,
            output_device: None,
            channel_capacity: 64,
        }
    }
}

/// Voice activity detection and utterance-assembly configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// Frame size in milliseconds (`VAD_SIZE`).
    pub vad_size_ms: u32,
    /// Voicing probability threshold above which a frame is "voiced"
    /// (`VAD_THRESHOLD`).
    pub vad_threshold: f32,
    /// Pre-roll ring-buffer capacity in milliseconds (`BUFFER_SIZE`).
    pub buffer_size_ms: u32,
    /// Number of consecutive unvoiced frames that end an utterance
    /// (`PAUSE_LIMIT`, expressed as a frame count derived from milliseconds).
    pub pause_limit_ms: u32,
    /// Barge-in / playback-monitor poll interval in milliseconds
    /// (`PAUSE_TIME`).
    pub pause_time_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            vad_size_ms: 32,
            vad_threshold: 0.7,
            buffer_size_ms: 640,
            pause_limit_ms: 640,
            pause_time_ms: 100,
        }
    }
}

impl VadConfig {
    /// Frame length in samples at the given sample rate.
    pub fn frame_samples(&self, sample_rate: u32) -> usize {
        (sample_rate as usize * self.vad_size_ms as usize) / 1000
    }

    /// Number of frames held in the pre-roll ring buffer.
    pub fn preroll_frames(&self) -> usize {
        (self.buffer_size_ms / self.vad_size_ms.max(1)) as usize
    }

    /// Number of consecutive unvoiced frames that end an utterance.
    pub fn pause_limit_frames(&self) -> usize {
        (self.pause_limit_ms / self.vad_size_ms.max(1)) as usize
    }
}

/// Speech-to-text configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Lowercased transcripts that are dropped as ASR hallucinations
    /// (`STT_HALLUCINATIONS`).
    pub hallucinations: Vec<String>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            hallucinations: vec![
                "thank you.".to_string(),
                "thanks for watching!".to_string(),
                "you".to_string(),
            ],
        }
    }
}

/// Language model streaming configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the llama.cpp-compatible completion server.
    pub server_url: String,
    /// Path to a llama-server binary to spawn, if not using an external server.
    pub spawn_path: Option<String>,
    /// System prompt prepended to every conversation.
    pub system_prompt: String,
    /// Suffix stopwords stripped from the end of a generated sentence before
    /// it is spoken (`LLM_STOPWORDS`).
    pub stopwords: Vec<String>,
    /// Exact (post-cleanup) sentences dropped instead of spoken
    /// (`AI_OUTPUT_TO_IGNORE`).
    pub ignore_outputs: Vec<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            spawn_path: None,
            system_prompt: "You are a helpful voice assistant. Keep replies short.".to_string(),
            stopwords: vec!["User:".to_string(), "Assistant:".to_string()],
            ignore_outputs: vec![String::new()],
        }
    }
}

/// Text-to-speech configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Output sample rate in Hz (`RATE`).
    pub sample_rate: u32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self { sample_rate: 24_000 }
    }
}

/// Wake-word gating configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Wake word required at the start of an accepted utterance, lowercased.
    /// Empty disables wake-word gating entirely.
    pub wake_word: String,
    /// Maximum Levenshtein distance (as a fraction of word length) for a
    /// token to count as a wake-word match (`SIMILARITY_THRESHOLD`).
    pub similarity_threshold: f32,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            wake_word: String::new(),
            similarity_threshold: 0.6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let cfg = Config::default();
        let text = toml::to_string(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&text).expect("parse");
        assert_eq!(parsed.audio.sample_rate, cfg.audio.sample_rate);
        assert_eq!(parsed.vad.vad_threshold, cfg.vad.vad_threshold);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let path = std::path::Path::new("/nonexistent/path/does-not-exist.toml");
        let cfg = Config::load(path).expect("load");
        assert_eq!(cfg.audio.sample_rate, AudioConfig::default().sample_rate);
    }

    #[test]
    fn frame_samples_derives_from_sample_rate_and_vad_size() {
        let vad = VadConfig::default();
        assert_eq!(vad.frame_samples(16_000), 512);
    }

    #[test]
    fn preroll_and_pause_limit_frame_counts() {
        let vad = VadConfig::default();
        assert_eq!(vad.preroll_frames(), 20);
        assert_eq!(vad.pause_limit_frames(), 20);
    }
}
