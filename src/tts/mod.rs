//! Text-to-speech: the `SpeechSynthesizer` collaborator trait.

use crate::error::Result;

/// Narrow collaborator interface for a text-to-speech engine.
pub trait SpeechSynthesizer: Send {
    /// Synthesize `text` to mono f32 PCM at the engine's native sample rate.
    ///
    /// # Errors
    ///
    /// Returns an error if synthesis fails.
    fn generate_speech_audio(&mut self, text: &str) -> Result<Vec<f32>>;

    /// The sample rate of audio returned by `generate_speech_audio`.
    fn sample_rate(&self) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SilentTts {
        rate: u32,
    }

    impl SpeechSynthesizer for SilentTts {
        fn generate_speech_audio(&mut self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0; text.len() * 10])
        }

        fn sample_rate(&self) -> u32 {
            self.rate
        }
    }

    #[test]
    fn trait_object_is_usable_behind_a_box() {
        let mut tts: Box<dyn SpeechSynthesizer> = Box::new(SilentTts { rate: 24_000 });
        let samples = tts.generate_speech_audio("hi").unwrap();
        assert_eq!(samples.len(), 20);
        assert_eq!(tts.sample_rate(), 24_000);
    }
}
