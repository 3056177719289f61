//! NDJSON line reframing for chunked backend responses.
//!
//! Ollama streams newline-delimited JSON, but the HTTP transport fragments
//! the body at arbitrary byte boundaries. [`LineFramer`] reassembles those
//! fragments into complete lines; [`lines`] lifts it over an async byte
//! stream. Blank lines are passed through — filtering them is the caller's
//! concern, keeping this module a pure byte-to-line transform.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt, stream::BoxStream};

use crate::error::UpstreamError;

/// Incremental newline splitter with a residual buffer.
///
/// Bytes after the last newline of a fragment stay buffered until a later
/// fragment completes the line. A residual without a trailing newline at
/// end-of-stream is an incomplete record and is dropped with the framer.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: BytesMut,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw fragment, returning every complete line it finishes.
    ///
    /// Emits one line per newline found — a single fragment can complete
    /// several lines, and a fragment without a newline (or an empty one)
    /// completes none. The trailing `\n` is stripped, along with a `\r`
    /// before it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(end) = find_newline(&self.buf) {
            let line = self.buf.split_to(end);
            let text = String::from_utf8_lossy(&line[..end - 1]);
            lines.push(text.strip_suffix('\r').unwrap_or(&text).to_string());
        }
        lines
    }
}

/// Position just past the next `\n` in the buffer, if any.
fn find_newline(buf: &BytesMut) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n').map(|pos| pos + 1)
}

/// State threaded through the `unfold` stream.
struct LineState {
    stream: BoxStream<'static, Result<Bytes, reqwest::Error>>,
    framer: LineFramer,
    pending: VecDeque<String>,
    done: bool,
}

/// Convert a fragmented byte stream into a stream of complete lines.
///
/// A transport error mid-stream surfaces once as `Err` and ends the
/// stream; a clean upstream close simply ends it.
pub fn lines<S>(byte_stream: S) -> impl Stream<Item = Result<String, UpstreamError>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let state = LineState {
        stream: byte_stream.boxed(),
        framer: LineFramer::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(line) = st.pending.pop_front() {
                return Some((Ok(line), st));
            }
            if st.done {
                return None;
            }

            match st.stream.next().await {
                Some(Ok(chunk)) => st.pending.extend(st.framer.feed(&chunk)),
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(UpstreamError::Unreachable(e.to_string())), st));
                }
                None => {
                    st.done = true;
                    return None;
                }
            }
        }
    })
}
