use bytes::Bytes;
use serde::Serialize;

/// A wire object that can be written as one SSE frame.
pub trait SseFrame: Serialize {
    /// Terminal marker written after the last frame of a successful stream.
    const DONE_MARKER: Option<&'static str>;

    /// `event:` name for event-named dialects, `None` for data-only ones.
    fn event_name(&self) -> Option<&'static str>;
}

/// Serializes one frame as `event: {type}\ndata: {json}\n\n` or
/// `data: {json}\n\n`.
pub fn format_event<T: SseFrame + ?Sized>(frame: &T) -> Result<String, serde_json::Error> {
    let data = serde_json::to_string(frame)?;
    Ok(format_data(frame.event_name(), &data))
}

pub fn format_done<T: SseFrame>() -> Option<&'static str> {
    T::DONE_MARKER
}

pub fn format_data(event: Option<&str>, data: &str) -> String {
    let mut out = String::with_capacity(data.len() + 32);
    if let Some(event) = event {
        out.push_str("event: ");
        out.push_str(event);
        out.push('\n');
    }
    // Every line of a multi-line payload gets its own `data:` prefix.
    for line in data.split('\n') {
        out.push_str("data: ");
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE decoder. Bytes may be split anywhere, including inside a
/// multi-byte UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bytes(&mut self, chunk: &Bytes) -> Vec<SseEvent> {
        self.push(chunk.as_ref())
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let mut line = String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }
            self.handle_line(&line, &mut events);
        }

        events
    }

    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let mut line = String::from_utf8_lossy(&raw).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }
            self.handle_line(&line, &mut events);
        }
        self.flush(&mut events);
        events
    }

    fn handle_line(&mut self, line: &str, events: &mut Vec<SseEvent>) {
        if line.is_empty() {
            self.flush(events);
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => {
                self.event = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "data" => self.data_lines.push(value.to_string()),
            _ => {}
        }
    }

    fn flush(&mut self, events: &mut Vec<SseEvent>) {
        if self.event.is_none() && self.data_lines.is_empty() {
            return;
        }
        events.push(SseEvent {
            event: self.event.take(),
            data: self.data_lines.join("\n"),
        });
        self.data_lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Named {
        #[serde(rename = "type")]
        kind: &'static str,
        value: u32,
    }

    impl SseFrame for Named {
        const DONE_MARKER: Option<&'static str> = None;

        fn event_name(&self) -> Option<&'static str> {
            Some(self.kind)
        }
    }

    #[derive(Serialize)]
    struct DataOnly {
        value: u32,
    }

    impl SseFrame for DataOnly {
        const DONE_MARKER: Option<&'static str> = Some("data: [DONE]\n\n");

        fn event_name(&self) -> Option<&'static str> {
            None
        }
    }

    #[test]
    fn named_event_framing() {
        let frame = Named {
            kind: "ping",
            value: 1,
        };
        assert_eq!(
            format_event(&frame).unwrap(),
            "event: ping\ndata: {\"type\":\"ping\",\"value\":1}\n\n"
        );
    }

    #[test]
    fn data_only_framing_is_byte_stable() {
        let frame = DataOnly { value: 7 };
        let first = format_event(&frame).unwrap();
        let second = format_event(&frame).unwrap();
        assert_eq!(first, "data: {\"value\":7}\n\n");
        assert_eq!(first, second);
        assert_eq!(format_done::<DataOnly>(), Some("data: [DONE]\n\n"));
        assert_eq!(format_done::<Named>(), None);
    }

    #[test]
    fn parser_handles_split_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"event: message_st").is_empty());
        assert!(parser.push(b"art\ndata: {\"a\"").is_empty());
        let events = parser.push(b":1}\n\ndata: [DONE]\n\n");
        assert_eq!(
            events,
            vec![
                SseEvent {
                    event: Some("message_start".to_string()),
                    data: "{\"a\":1}".to_string(),
                },
                SseEvent {
                    event: None,
                    data: "[DONE]".to_string(),
                },
            ]
        );
    }

    #[test]
    fn parser_keeps_utf8_split_across_chunks() {
        let text = "data: héllo\n\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xc3).unwrap() + 1;
        let mut parser = SseParser::new();
        assert!(parser.push(&text[..split]).is_empty());
        let events = parser.push(&text[split..]);
        assert_eq!(events[0].data, "héllo");
    }

    #[test]
    fn parser_flushes_trailing_event_on_finish() {
        let mut parser = SseParser::new();
        assert!(parser.push(b": comment\ndata: tail").is_empty());
        let events = parser.finish();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "tail");
    }
}
