/// Incremental SSE (Server-Sent Events) parser for streamed model responses.
///
/// Events are separated by a blank line and carry optional `event:` and one
/// or more `data:` lines. Bytes are buffered raw so a multi-byte character
/// split across two network chunks is decoded intact.

/// A single parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// The `event:` field, if present.
    pub event: Option<String>,
    /// The `data:` lines joined with `\n`.
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from the HTTP body. Returns every event completed by
    /// this chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        // CRLF framing is collapsed to LF; JSON payloads never carry a raw CR.
        self.buffer
            .extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(boundary) = find_blank_line(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..boundary + 2).collect();
            if let Some(event) = parse_block(&block[..boundary]) {
                events.push(event);
            }
        }
        events
    }

    /// Flush an event left unterminated when the body ended.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_block(&rest)
    }
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_block(block: &[u8]) -> Option<SseEvent> {
    let text = String::from_utf8_lossy(block);
    let mut event_type: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(val) = line.strip_prefix("event:") {
            event_type = Some(val.trim().to_string());
        } else if let Some(val) = line.strip_prefix("data:") {
            data_lines.push(val.strip_prefix(' ').unwrap_or(val));
        }
        // id:, retry: and ":" comments are ignored
    }

    if data_lines.is_empty() {
        return None;
    }
    Some(SseEvent {
        event: event_type,
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_sse() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: hello\n\ndata: world\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "hello");
        assert_eq!(events[1].data, "world");
    }

    #[test]
    fn test_crlf_framing() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"event: chunk\r\ndata: {\"a\":1}\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("chunk"));
        assert_eq!(events[0].data, "{\"a\":1}");
    }

    #[test]
    fn test_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: hel").is_empty());
        let events = parser.feed(b"lo\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut parser = SseParser::new();
        let bytes = "data: café\n\n".as_bytes();
        let split = bytes.len() - 3; // inside the two-byte 'é'
        assert!(parser.feed(&bytes[..split]).is_empty());
        let events = parser.feed(&bytes[split..]);
        assert_eq!(events[0].data, "café");
    }

    #[test]
    fn test_finish_flushes_trailing_event() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b": keep-alive\n\ndata: tail").is_empty());
        assert_eq!(parser.finish().map(|e| e.data), Some("tail".to_string()));
        assert!(parser.finish().is_none());
    }
}
