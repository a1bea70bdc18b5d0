//! Line-delimited event stream decoding.
//!
//! `:streamQuery` answers with one JSON event per line. With `alt=sse` each
//! line is prefixed with `data:` and events are separated by blank lines;
//! both forms are accepted.

use std::fmt::Display;

use agent_engine_core::{AgentEvent, EngineError, EventStream};
use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};

/// Incremental decoder for newline-separated JSON events.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: BytesMut,
}

impl LineDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<AgentEvent, EngineError>> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            if let Some(event) = parse_line(&line[..pos]) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line without a newline.
    pub fn finish(&mut self) -> Option<Result<AgentEvent, EngineError>> {
        let rest = self.buf.split();
        parse_line(rest.chunk())
    }
}

fn parse_line(line: &[u8]) -> Option<Result<AgentEvent, EngineError>> {
    let line = std::str::from_utf8(line)
        .map_err(|e| EngineError::Decode(e.to_string()))
        .map(str::trim);
    let line = match line {
        Ok(line) => line,
        Err(e) => return Some(Err(e)),
    };

    // SSE comments and non-data fields carry no events.
    if line.is_empty() || line.starts_with(':') || line.starts_with("event:") || line.starts_with("id:")
    {
        return None;
    }
    let payload = line.strip_prefix("data:").map_or(line, str::trim_start);
    Some(
        serde_json::from_str(payload)
            .map(AgentEvent::new)
            .map_err(EngineError::from),
    )
}

/// Decode a byte stream into events, ending after the first transport error.
pub fn decode_events<S, E>(body: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = (Box::pin(body), LineDecoder::new(), false);
    futures::stream::unfold(state, |(mut body, mut decoder, done)| async move {
        if done {
            return None;
        }
        match body.next().await {
            Some(Ok(chunk)) => {
                let events = decoder.push(&chunk);
                Some((events, (body, decoder, false)))
            }
            Some(Err(e)) => {
                let events = vec![Err(EngineError::Stream(e.to_string()))];
                Some((events, (body, decoder, true)))
            }
            None => {
                let events = decoder.finish().into_iter().collect();
                Some((events, (body, decoder, true)))
            }
        }
    })
    .flat_map(futures::stream::iter)
    .boxed()
}
