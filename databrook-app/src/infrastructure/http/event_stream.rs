//! Minimal server-sent-events reader for the tally stream.

use crate::application::TallyStream;
use crate::domain::TallyPush;
use futures::{Stream, StreamExt};

/// Turn a response body into tally pushes. Frames that are not tally JSON
/// (keep-alive comments, unknown events) are skipped; the stream ends with
/// the connection.
pub fn tally_pushes<S, B, E>(body: S) -> TallyStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let body = Box::pin(body);
    futures::stream::unfold((body, Vec::new()), |(mut body, mut buffer)| async move {
        loop {
            if let Some(end) = frame_end(&buffer) {
                let frame: Vec<u8> = buffer.drain(..end).collect();
                match std::str::from_utf8(&frame) {
                    Ok(frame) => {
                        if let Some(push) = parse_frame(frame) {
                            return Some((push, (body, buffer)));
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "tally event is not utf-8"),
                }
                continue;
            }
            match body.next().await {
                Some(Ok(chunk)) => buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "tally stream interrupted");
                    return None;
                }
                None => return None,
            }
        }
    })
    .boxed()
}

/// Index just past the blank line that ends the first complete frame.
fn frame_end(buffer: &[u8]) -> Option<usize> {
    buffer.iter().enumerate().find_map(|(i, &byte)| {
        if byte != b'\n' {
            return None;
        }
        match &buffer[i + 1..] {
            [b'\n', ..] => Some(i + 2),
            [b'\r', b'\n', ..] => Some(i + 3),
            _ => None,
        }
    })
}

fn parse_frame(frame: &str) -> Option<TallyPush> {
    let mut event = None;
    let mut data = Vec::new();
    for line in frame.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            event = Some(value.trim());
        } else if let Some(value) = line.strip_prefix("data:") {
            data.push(value.strip_prefix(' ').unwrap_or(value));
        }
    }
    if data.is_empty() || event.is_some_and(|e| e != "tally") {
        return None;
    }
    match serde_json::from_str(&data.join("\n")) {
        Ok(push) => Some(push),
        Err(e) => {
            tracing::warn!(error = %e, "malformed tally event");
            None
        }
    }
}
