// Chunked log stream decoding (`data: <json>` frames split across reads)
use bytes::{Buf, BytesMut};
use serde::Deserialize;
use std::fmt;

/// One user-visible line of installer output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Message(String),
    Done,
    Failed(String),
}

impl LogLine {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LogLine::Message(_))
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLine::Message(message) => f.write_str(message),
            LogLine::Done => f.write_str("Done."),
            LogLine::Failed(message) => write!(f, "Error: {}", message),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum LogFrame {
    Log {
        #[serde(default)]
        message: String,
    },
    Done {
        status: String,
        #[serde(default)]
        message: Option<String>,
    },
    Error {
        #[serde(default)]
        message: String,
    },
}

impl From<LogFrame> for LogLine {
    fn from(frame: LogFrame) -> Self {
        match frame {
            LogFrame::Log { message } => LogLine::Message(message),
            LogFrame::Done { status, .. } if status == "ok" => LogLine::Done,
            LogFrame::Done { status, message } => LogLine::Failed(message.unwrap_or(status)),
            LogFrame::Error { message } => LogLine::Failed(message),
        }
    }
}

/// Buffers raw bytes and yields a `LogLine` for every complete line.
/// Partial lines (including split UTF-8 sequences) wait for the next chunk.
#[derive(Debug, Default)]
pub struct LogStreamDecoder {
    buffer: BytesMut,
}

impl LogStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<LogLine> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            if let Some(decoded) = decode_line(&line) {
                lines.push(decoded);
            }
        }
        lines
    }

    /// Decode whatever is left once the body ends without a final newline.
    pub fn finish(&mut self) -> Vec<LogLine> {
        let rest = self.buffer.split();
        decode_line(&rest).into_iter().collect()
    }
}

fn decode_line(raw: &[u8]) -> Option<LogLine> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim_end_matches('\r');
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload.is_empty() {
        return None;
    }
    match serde_json::from_str::<LogFrame>(payload) {
        Ok(frame) => Some(frame.into()),
        Err(e) => {
            tracing::warn!("Skipping undecodable log frame: {}", e);
            None
        }
    }
}
