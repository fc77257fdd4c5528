//! Dialogue management: the running transcript and turn alternation.

use crate::config::LlmConfig;
use crate::pipeline::messages::{DialogueTurn, Speaker};

/// Append-only log of the conversation so far, rendered into the LLM
/// prompt template on every turn.
#[derive(Debug, Default, Clone)]
pub struct TranscriptLog {
    turns: Vec<DialogueTurn>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.turns.push(DialogueTurn {
            speaker,
            text: text.into(),
        });
    }

    pub fn turns(&self) -> &[DialogueTurn] {
        &self.turns
    }
}

/// Owns the transcript and decides when a user turn is ready to send to the
/// LLM and how an assistant turn is recorded once generation finishes.
pub struct DialogueManager {
    transcript: TranscriptLog,
    system_prompt: String,
}

impl DialogueManager {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            transcript: TranscriptLog::new(),
            system_prompt: config.system_prompt.clone(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn transcript(&self) -> &TranscriptLog {
        &self.transcript
    }

    /// Record an accepted ASR transcript as a user turn.
    pub fn accept_user_turn(&mut self, text: impl Into<String>) {
        self.transcript.push(Speaker::User, text);
    }

    /// Record a completed assistant response as a single turn, joining its
    /// sentences with a single space. Called regardless of whether playback
    /// of the response finished or was interrupted — the transcript records
    /// what was *said*, not what was *heard*; an `<INTERRUPTED>` marker, if
    /// any, is expected to already be part of `sentences`' last element.
    pub fn commit_assistant_turn(&mut self, sentences: &[String]) {
        if sentences.is_empty() {
            return;
        }
        let text = sentences.join(" ");
        self.transcript.push(Speaker::Assistant, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_then_assistant_turns_alternate() {
        let mut manager = DialogueManager::new(&LlmConfig::default());
        manager.accept_user_turn("what time is it");
        manager.commit_assistant_turn(&["It's".to_string(), "3pm.".to_string()]);

        let turns = manager.transcript().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].speaker, Speaker::User);
        assert_eq!(turns[1].speaker, Speaker::Assistant);
        assert_eq!(turns[1].text, "It's 3pm.");
    }

    #[test]
    fn empty_assistant_response_is_not_recorded() {
        let mut manager = DialogueManager::new(&LlmConfig::default());
        manager.commit_assistant_turn(&[]);
        assert!(manager.transcript().turns().is_empty());
    }
}
