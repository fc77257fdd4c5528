//! Speech-to-text: the `Transcriber` collaborator trait and the `ASRStage`
//! that wraps it with hallucination filtering and wake-word gating.

use crate::config::{ConversationConfig, SttConfig};
use crate::error::Result;
use crate::wakeword;

/// Narrow collaborator interface for a speech-to-text engine. Implementations
/// do their own model loading; the pipeline only ever calls `transcribe`.
pub trait Transcriber: Send {
    /// Transcribe mono PCM samples at `sample_rate` to text.
    ///
    /// # Errors
    ///
    /// Returns an error if transcription fails.
    fn transcribe(&mut self, samples: &[f32], sample_rate: u32) -> Result<String>;
}

/// Wraps a `Transcriber` with the hallucination filter and wake-word gate.
pub struct AsrStage {
    transcriber: Box<dyn Transcriber>,
    stt: SttConfig,
    conversation: ConversationConfig,
}

impl AsrStage {
    pub fn new(
        transcriber: Box<dyn Transcriber>,
        stt: SttConfig,
        conversation: ConversationConfig,
    ) -> Self {
        Self {
            transcriber,
            stt,
            conversation,
        }
    }

    /// Transcribe an utterance and apply the hallucination filter and
    /// wake-word gate. Returns `None` if the utterance should be dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying transcriber fails.
    pub fn process(&mut self, samples: &[f32], sample_rate: u32) -> Result<Option<String>> {
        let text = self.transcriber.transcribe(samples, sample_rate)?;
        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Ok(None);
        }

        if self.is_hallucination(trimmed) {
            tracing::debug!(text = trimmed, "dropped ASR hallucination");
            return Ok(None);
        }

        if !wakeword::contains_wake_word(
            trimmed,
            &self.conversation.wake_word,
            self.conversation.similarity_threshold,
        ) {
            tracing::debug!(text = trimmed, "dropped: wake word not present");
            return Ok(None);
        }

        tracing::info!(text = trimmed, "ASR transcript accepted");
        Ok(Some(trimmed.to_string()))
    }

    fn is_hallucination(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.stt
            .hallucinations
            .iter()
            .any(|h| h.to_lowercase() == lowered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTranscriber(String);

    impl Transcriber for FixedTranscriber {
        fn transcribe(&mut self, _samples: &[f32], _sample_rate: u32) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    fn conversation(wake_word: &str) -> ConversationConfig {
        ConversationConfig {
            wake_word: wake_word.to_string(),
            similarity_threshold: 0.6,
        }
    }

    #[test]
    fn drops_known_hallucinations() {
        let mut stage = AsrStage::new(
            Box::new(FixedTranscriber("Thank you.".to_string())),
            SttConfig::default(),
            conversation(""),
        );
        let result = stage.process(&[], 16_000).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn drops_empty_transcript() {
        let mut stage = AsrStage::new(
            Box::new(FixedTranscriber(String::new())),
            SttConfig::default(),
            conversation(""),
        );
        assert!(stage.process(&[], 16_000).unwrap().is_none());
    }

    #[test]
    fn passes_through_without_wake_word_configured() {
        let mut stage = AsrStage::new(
            Box::new(FixedTranscriber("what's the weather".to_string())),
            SttConfig::default(),
            conversation(""),
        );
        assert_eq!(
            stage.process(&[], 16_000).unwrap(),
            Some("what's the weather".to_string())
        );
    }

    #[test]
    fn rejects_transcript_missing_wake_word() {
        let mut stage = AsrStage::new(
            Box::new(FixedTranscriber("what's the weather".to_string())),
            SttConfig::default(),
            conversation("glados"),
        );
        assert!(stage.process(&[], 16_000).unwrap().is_none());
    }

    #[test]
    fn accepts_transcript_with_wake_word() {
        let mut stage = AsrStage::new(
            Box::new(FixedTranscriber("hey glados what time is it".to_string())),
            SttConfig::default(),
            conversation("glados"),
        );
        assert!(stage.process(&[], 16_000).unwrap().is_some());
    }
}
