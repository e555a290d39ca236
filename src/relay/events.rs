use std::fmt::Write;

/// One record of a `/api/stream` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Content(String),
    Done,
    Error(String),
}

impl StreamEvent {
    /// `Done` and `Error` close the stream; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Content(_))
    }

    /// Renders the event as a single `data:` line followed by a blank line.
    pub fn to_sse_frame(&self) -> String {
        match self {
            Self::Content(content) => format!(
                "data: {{\"content\": \"{}\", \"done\": false}}\n\n",
                escape_event_text(content)
            ),
            Self::Done => "data: {\"content\": \"\", \"done\": true}\n\n".to_string(),
            Self::Error(message) => format!(
                "data: {{\"error\": \"{}\", \"done\": true}}\n\n",
                escape_event_text(message)
            ),
        }
    }
}

/// Escapes text for embedding in a hand-framed JSON string.
///
/// Quotes and line breaks would otherwise split or truncate the record, so
/// every character JSON forbids inside a string literal is escaped.
pub fn escape_event_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(escaped, "\\u{:04x}", c as u32);
            }
            c => escaped.push(c),
        }
    }
    escaped
}
