//! Incremental decoding of the Ollama chat NDJSON stream.
//!
//! Ollama emits one JSON object per line:
//! ```text
//! {"model":"deepseek-r1:8b","message":{"role":"assistant","content":"<think>"},"done":false}
//! {"model":"deepseek-r1:8b","message":{"role":"assistant","content":"Hmm"},"done":false}
//! {"model":"deepseek-r1:8b","message":{"role":"assistant","content":""},"done":true}
//! ```
//!
//! Network chunks do not line up with lines, so bytes are buffered until a
//! newline arrives and only complete lines are decoded.

use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::StreamError;
use crate::state::StreamFragment;
use crate::think;

/// Byte buffer that hands out complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    // bytes already searched for a newline
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line without its terminator, if one has arrived.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buf.len();
            return None;
        };
        let pos = self.scanned + offset;
        self.scanned = 0;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    /// Whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            None
        } else {
            self.scanned = 0;
            Some(std::mem::take(&mut self.buf))
        }
    }
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    context: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    thinking: Option<String>,
}

/// Running totals across decoded lines.
#[derive(Debug, Default)]
pub(crate) struct Accumulator {
    message: String,
    thinking: String,
    lines: usize,
}

impl Accumulator {
    /// Decode one line and fold it into the totals. Blank lines yield `None`.
    pub(crate) fn process_line(&mut self, raw: &[u8]) -> Result<Option<StreamFragment>, StreamError> {
        let line = std::str::from_utf8(raw).map_err(|e| {
            StreamError::protocol(
                format!("invalid UTF-8: {e}"),
                String::from_utf8_lossy(raw),
            )
        })?;
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let chunk: ChatChunk = serde_json::from_str(line).map_err(|e| {
            tracing::warn!(error = %e, "unparsable stream line");
            StreamError::protocol(format!("invalid JSON: {e}"), line)
        })?;

        if let Some(error) = chunk.error {
            tracing::warn!(error = error.as_str(), "endpoint reported an error mid-stream");
            return Err(StreamError::protocol(error, line));
        }

        if let Some(message) = chunk.message {
            if let Some(content) = message.content {
                self.message.push_str(&content);
            }
            if let Some(thinking) = message.thinking {
                self.thinking.push_str(&thinking);
            }
        }

        if let Some(serde_json::Value::String(context)) = &chunk.context {
            if context.contains(think::OPEN_TAG) {
                if let Some(block) = think::first_closed_block(context) {
                    self.thinking = block;
                }
            }
        }

        self.lines += 1;
        Ok(Some(self.snapshot(false)))
    }

    pub(crate) fn snapshot(&self, done: bool) -> StreamFragment {
        StreamFragment {
            message: Some(self.message.clone()),
            thinking: (!self.thinking.is_empty()).then(|| self.thinking.clone()),
            done,
        }
    }

    pub(crate) fn lines(&self) -> usize {
        self.lines
    }
}

/// Decode a chat response body, reporting the accumulated text after every
/// line.
///
/// `on_update` always receives the full text so far. A terminal fragment with
/// `done` set is delivered once the body ends and is also returned. Once
/// `cancel` fires no further updates are delivered and the call resolves to
/// [`StreamError::Cancelled`].
pub async fn drive_stream<S, B, E, F>(
    bytes: S,
    mut on_update: F,
    cancel: &CancellationToken,
) -> Result<StreamFragment, StreamError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<StreamError>,
    F: FnMut(StreamFragment),
{
    let mut bytes = std::pin::pin!(bytes);
    let mut lines = LineBuffer::new();
    let mut acc = Accumulator::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            next = bytes.next() => next,
        };
        let Some(chunk) = next else { break };
        let chunk = chunk.map_err(Into::into)?;
        lines.push(chunk.as_ref());

        while let Some(line) = lines.next_line() {
            if cancel.is_cancelled() {
                return Err(StreamError::Cancelled);
            }
            if let Some(fragment) = acc.process_line(&line)? {
                on_update(fragment);
            }
        }
    }

    if let Some(rest) = lines.finish() {
        if let Some(fragment) = acc.process_line(&rest)? {
            if cancel.is_cancelled() {
                return Err(StreamError::Cancelled);
            }
            on_update(fragment);
        }
    }

    if cancel.is_cancelled() {
        return Err(StreamError::Cancelled);
    }

    tracing::debug!(lines = acc.lines(), "chat stream finished");
    let terminal = acc.snapshot(true);
    on_update(terminal.clone());
    Ok(terminal)
}
