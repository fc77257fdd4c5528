//! Server-sent-events parsing for the LLM completion stream.
//!
//! llama.cpp-compatible servers stream `data: {json}\n\n` records. This is a
//! small incremental parser so callers can feed it raw byte chunks as they
//! arrive over HTTP without buffering the whole response.

/// One parsed SSE record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event_type: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

impl SseEvent {
    /// True if `data` is the literal `[DONE]` sentinel some servers send to
    /// end a stream.
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

#[derive(Default)]
struct EventBuilder {
    event_type: Option<String>,
    data_lines: Vec<String>,
    id: Option<String>,
}

impl EventBuilder {
    fn is_empty(&self) -> bool {
        self.event_type.is_none() && self.data_lines.is_empty() && self.id.is_none()
    }

    fn push_line(&mut self, line: &str) {
        if line.starts_with(':') {
            return; // comment line
        }
        let Some((field, value)) = parse_field(line) else {
            return;
        };
        match field {
            "event" => self.event_type = Some(value.to_string()),
            "data" => self.data_lines.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
    }

    fn finish(self) -> Option<SseEvent> {
        if self.data_lines.is_empty() {
            return None;
        }
        Some(SseEvent {
            event_type: self.event_type,
            data: self.data_lines.join("\n"),
            id: self.id,
        })
    }
}

/// Parse a single `field: value` line, stripping one leading space from the
/// value per the SSE spec.
fn parse_field(line: &str) -> Option<(&str, &str)> {
    let (field, rest) = line.split_once(':')?;
    let value = rest.strip_prefix(' ').unwrap_or(rest);
    Some((field, value))
}

/// Batch-parse a complete SSE text blob into zero or more events.
pub fn parse_sse_text(text: &str) -> Vec<SseEvent> {
    let mut parser = SseLineParser::new();
    parser.push(text.as_bytes());
    parser.flush();
    parser.take_events()
}

/// Incremental SSE parser: feed it arbitrary byte chunks via `push`, drain
/// completed events with `take_events`.
#[derive(Default)]
pub struct SseLineParser {
    buffer: String,
    builder: EventBuilder,
    events: Vec<SseEvent>,
}

impl SseLineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes (assumed UTF-8; invalid sequences are replaced).
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
        self.drain_lines();
    }

    fn drain_lines(&mut self) {
        loop {
            let Some(pos) = self.buffer.find('\n') else {
                break;
            };
            let line = self.buffer[..pos].to_string();
            self.buffer.drain(..=pos);
            let line = line.strip_suffix('\r').unwrap_or(&line).to_string();

            if line.is_empty() {
                if !self.builder.is_empty() {
                    let finished = std::mem::take(&mut self.builder);
                    if let Some(event) = finished.finish() {
                        self.events.push(event);
                    }
                }
            } else {
                self.builder.push_line(&line);
            }
        }
    }

    /// Flush any trailing partial record (no terminating blank line seen).
    pub fn flush(&mut self) {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.builder.push_line(&line);
        }
        if !self.builder.is_empty() {
            let finished = std::mem::take(&mut self.builder);
            if let Some(event) = finished.finish() {
                self.events.push(event);
            }
        }
    }

    /// Drain all events parsed so far.
    pub fn take_events(&mut self) -> Vec<SseEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_field_splits_on_first_colon() {
        assert_eq!(parse_field("data: hello"), Some(("data", "hello")));
        assert_eq!(parse_field("data:hello"), Some(("data", "hello")));
        assert_eq!(parse_field("no-colon-here"), None);
    }

    #[test]
    fn is_done_recognizes_sentinel() {
        let event = SseEvent {
            event_type: None,
            data: "[DONE]".to_string(),
            id: None,
        };
        assert!(event.is_done());
    }

    #[test]
    fn parse_sse_text_handles_multiple_records() {
        let text = "data: {\"content\":\"hi\"}\n\ndata: {\"content\":\" there\"}\n\n";
        let events = parse_sse_text(text);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "{\"content\":\"hi\"}");
        assert_eq!(events[1].data, "{\"content\":\" there\"}");
    }

    #[test]
    fn incremental_parsing_across_chunk_boundaries() {
        let mut parser = SseLineParser::new();
        parser.push(b"data: {\"cont");
        assert!(parser.take_events().is_empty());
        parser.push(b"ent\":\"hi\"}\n\n");
        let events = parser.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"content\":\"hi\"}");
    }

    #[test]
    fn crlf_line_endings_are_handled() {
        let mut parser = SseLineParser::new();
        parser.push(b"data: hi\r\n\r\n");
        let events = parser.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hi");
    }

    #[test]
    fn comment_lines_are_ignored() {
        let mut parser = SseLineParser::new();
        parser.push(b": keep-alive\ndata: hi\n\n");
        let events = parser.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hi");
    }

    #[test]
    fn multi_line_data_is_joined_with_newlines() {
        let mut parser = SseLineParser::new();
        parser.push(b"data: line one\ndata: line two\n\n");
        let events = parser.take_events();
        assert_eq!(events[0].data, "line one\nline two");
    }

    #[test]
    fn flush_emits_a_trailing_unterminated_record() {
        let mut parser = SseLineParser::new();
        parser.push(b"data: partial");
        parser.flush();
        let events = parser.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "partial");
    }
}
