//! LLM streaming: prompt rendering, SSE consumption, and the
//! sentence-cleanup pipeline that turns raw tokens into speakable sentences.

pub mod sse;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::StreamExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::dialogue::TranscriptLog;
use crate::error::{PipelineError, Result};
use crate::pipeline::messages::Speaker;
use crate::llm::sse::SseLineParser;

const BOS_TOKEN: &str = "<|begin_of_text|>";

/// Render the running transcript into the Llama-3 chat template, with
/// `add_generation_prompt=true` (a trailing empty assistant turn) so the
/// server continues generation as the assistant.
pub fn render_prompt(system_prompt: &str, transcript: &TranscriptLog) -> String {
    let mut out = String::new();
    out.push_str(BOS_TOKEN);
    out.push_str("<|start_header_id|>system<|end_header_id|>\n\n");
    out.push_str(system_prompt);
    out.push_str("<|eot_id|>");

    for turn in transcript.turns() {
        let role = match turn.speaker {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        };
        out.push_str("<|start_header_id|>");
        out.push_str(role);
        out.push_str("<|end_header_id|>\n\n");
        out.push_str(&turn.text);
        out.push_str("<|eot_id|>");
    }

    out.push_str("<|start_header_id|>assistant<|end_header_id|>\n\n");
    out
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    stream: bool,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    content: String,
    #[serde(default)]
    stop: bool,
}

/// Abstracts the HTTP transport so the streaming logic can be tested
/// against a mock server without a real llama.cpp-compatible backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Open a completion stream for `prompt`, returning raw SSE body bytes
    /// as they arrive.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent.
    async fn stream_tokens(
        &self,
        prompt: &str,
    ) -> Result<std::pin::Pin<Box<dyn futures_util::Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>>;
}

/// `reqwest`-backed client talking to a llama.cpp-compatible `/completion`
/// endpoint.
pub struct HttpLlmClient {
    http: reqwest::Client,
    server_url: String,
}

impl HttpLlmClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_url: server_url.into(),
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn stream_tokens(
        &self,
        prompt: &str,
    ) -> Result<std::pin::Pin<Box<dyn futures_util::Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>>
    {
        let url = format!("{}/completion", self.server_url.trim_end_matches('/'));
        let body = CompletionRequest {
            stream: true,
            prompt,
        };

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Llm(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PipelineError::Llm(format!(
                "server returned {}",
                response.status()
            )));
        }

        Ok(Box::pin(response.bytes_stream()))
    }
}

/// Streams tokens from the LLM, accumulates them into sentences, and
/// applies the cleanup pipeline before a sentence is considered speakable.
pub struct LlmStreamer {
    client: Box<dyn LlmClient>,
    config: LlmConfig,
}

impl LlmStreamer {
    pub fn new(client: Box<dyn LlmClient>, config: LlmConfig) -> Self {
        Self { client, config }
    }

    /// Render the prompt from `transcript`, stream the completion, and
    /// return the cleaned sentences produced before either the server
    /// signalled `stop` or `speak_permitted` went false (barge-in).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or a chunk cannot be parsed.
    pub async fn generate(
        &self,
        transcript: &TranscriptLog,
        speak_permitted: &Arc<AtomicBool>,
    ) -> Result<Vec<String>> {
        let prompt = render_prompt(self.config.system_prompt.as_str(), transcript);
        let mut byte_stream = self.client.stream_tokens(&prompt).await?;
        let mut parser = SseLineParser::new();
        let mut pending = String::new();
        let mut sentences = Vec::new();

        while let Some(chunk) = byte_stream.next().await {
            if !speak_permitted.load(Ordering::SeqCst) {
                info!("LLM stream aborted: barge-in");
                break;
            }

            let bytes = chunk.map_err(|e| PipelineError::Llm(format!("stream error: {e}")))?;
            parser.push(&bytes);

            for event in parser.take_events() {
                if event.is_done() {
                    continue;
                }
                let parsed: CompletionChunk = match serde_json::from_str(&event.data) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!("failed to parse LLM chunk: {e}");
                        continue;
                    }
                };

                pending.push_str(&parsed.content);
                drain_sentences(&mut pending, &self.config, &mut sentences);

                if parsed.stop {
                    flush_remainder(&mut pending, &self.config, &mut sentences);
                    return Ok(sentences);
                }
            }
        }

        flush_remainder(&mut pending, &self.config, &mut sentences);
        Ok(sentences)
    }
}

/// Split `pending` on sentence-ending punctuation, cleaning and collecting
/// each complete sentence; leaves any trailing partial sentence in `pending`.
fn drain_sentences(pending: &mut String, config: &LlmConfig, out: &mut Vec<String>) {
    loop {
        let Some(pos) = pending.find(['.', '?', '!']) else {
            break;
        };
        let raw: String = pending.drain(..=pos).collect();
        if let Some(cleaned) = clean_sentence(&raw, config) {
            debug!("TTS text: \"{cleaned}\"");
            out.push(cleaned);
        }
    }
}

fn flush_remainder(pending: &mut String, config: &LlmConfig, out: &mut Vec<String>) {
    let raw = std::mem::take(pending);
    if let Some(cleaned) = clean_sentence(&raw, config) {
        out.push(cleaned);
    }
}

/// Sentence-cleanup pipeline: strip a configured suffix stopword, remove
/// stage directions and parentheticals, filter to a conservative character
/// class, trim trailing whitespace, and drop exact `ignore_outputs` matches.
fn clean_sentence(raw: &str, config: &LlmConfig) -> Option<String> {
    let mut text = raw.to_string();

    for stopword in &config.stopwords {
        if let Some(stripped) = text.strip_suffix(stopword.as_str()) {
            text = stripped.to_string();
        }
    }

    let asterisk_re = Regex::new(r"\*.*?\*").expect("static regex");
    let paren_re = Regex::new(r"\(.*?\)").expect("static regex");
    text = asterisk_re.replace_all(&text, "").to_string();
    text = paren_re.replace_all(&text, "").to_string();

    text = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || ".,?!;:'\" -".contains(*c))
        .collect();

    let text = text.trim_end().to_string();

    if config.ignore_outputs.iter().any(|ignored| ignored == &text) {
        return None;
    }
    if text.trim().is_empty() {
        return None;
    }

    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::messages::Speaker;

    #[test]
    fn prompt_includes_system_and_turns_with_trailing_assistant_header() {
        let mut transcript = TranscriptLog::new();
        transcript.push(Speaker::User, "hello");
        let rendered = render_prompt("be brief", &transcript);
        assert!(rendered.starts_with(BOS_TOKEN));
        assert!(rendered.contains("be brief"));
        assert!(rendered.contains("hello"));
        assert!(rendered.ends_with("<|start_header_id|>assistant<|end_header_id|>\n\n"));
    }

    #[test]
    fn clean_sentence_strips_stage_directions_and_parentheticals() {
        let config = LlmConfig::default();
        let cleaned = clean_sentence("*laughs* Sure (I think).", &config).unwrap();
        assert_eq!(cleaned, " Sure .");
    }

    #[test]
    fn clean_sentence_strips_configured_stopword_suffix() {
        let mut config = LlmConfig::default();
        config.stopwords = vec!["User:".to_string()];
        let cleaned = clean_sentence("Sure thing.User:", &config).unwrap();
        assert_eq!(cleaned, "Sure thing.");
    }

    #[test]
    fn clean_sentence_drops_ignored_outputs() {
        let mut config = LlmConfig::default();
        config.ignore_outputs = vec!["Okay.".to_string()];
        assert!(clean_sentence("Okay.", &config).is_none());
    }

    #[test]
    fn clean_sentence_drops_non_ascii_symbols() {
        let config = LlmConfig::default();
        let cleaned = clean_sentence("Hi \u{1F600} there!", &config).unwrap();
        assert_eq!(cleaned, "Hi  there!");
    }

    #[test]
    fn drain_sentences_splits_on_punctuation_and_keeps_partial_tail() {
        let config = LlmConfig::default();
        let mut pending = "Hi there. How are".to_string();
        let mut out = Vec::new();
        drain_sentences(&mut pending, &config, &mut out);
        assert_eq!(out, vec!["Hi there.".to_string()]);
        assert_eq!(pending, " How are");
    }
}
