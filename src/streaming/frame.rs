//! Event framing for the two supported transport modes.
//!
//! Canonical framing is typed SSE: `event: <kind>` + `data: <JSON>` +
//! blank-line terminator. The plain-text `LOG:`/`RESULT:` framing is an
//! earlier, simplified mode kept for compatibility; it has no metric or end
//! frames. Both framings encode and decode, and both round-trip.

use crate::domain::events::{event_timestamp, SolverEvent};
use crate::domain::models::MipSolution;

const SSE_KINDS: [&str; 4] = ["log", "metric", "result", "end"];

/// Frames one event for an SSE response body.
pub fn encode_sse(event: &SolverEvent) -> Result<String, serde_json::Error> {
    let data = serde_json::to_string(event)?;
    Ok(format!("event: {}\ndata: {}\n\n", event.kind(), data))
}

/// Incremental SSE decoder.
///
/// Events may arrive split across arbitrary read chunks; frames are buffered
/// until the blank-line terminator is seen. Unknown event kinds and frames
/// with unparsable data are skipped, never fatal.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk, returning every event completed by it.
    pub fn push(&mut self, chunk: &str) -> Vec<SolverEvent> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();
        while let Some(end) = self.buffer.find("\n\n") {
            let frame: String = self.buffer[..end].to_string();
            self.buffer.drain(..end + 2);
            if let Some(event) = parse_sse_frame(&frame) {
                events.push(event);
            }
        }
        events
    }
}

fn parse_sse_frame(frame: &str) -> Option<SolverEvent> {
    let mut kind: Option<&str> = None;
    let mut data = String::new();
    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            kind = Some(rest.trim());
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    // Unknown kinds are a forward-compatibility no-op.
    if !SSE_KINDS.contains(&kind?) {
        return None;
    }
    serde_json::from_str(&data).ok()
}

/// Frames one event for the plain-text mode. `metric` flattens to a `LOG:`
/// line (the mode has no metric frame); `end` has no frame at all.
pub fn encode_plain(event: &SolverEvent) -> Result<Option<String>, serde_json::Error> {
    let line = match event {
        SolverEvent::Log { message, .. } => Some(format!("LOG: {message}\n")),
        SolverEvent::Metric {
            objective_value,
            gap,
            iteration,
            ..
        } => Some(format!(
            "LOG: iteration {iteration}, objective {objective_value}, gap {gap}\n"
        )),
        SolverEvent::Result { solution, .. } => {
            Some(format!("RESULT: {}\n", serde_json::to_string(solution)?))
        }
        SolverEvent::End { .. } => None,
    };
    Ok(line)
}

/// Incremental decoder for the plain-text mode.
///
/// Yields a `log` event per `LOG:` line and a `result` event per `RESULT:`
/// line; consumers must treat the last result seen as authoritative. Lines
/// without a known prefix are ignored.
#[derive(Debug, Default)]
pub struct PlainTextDecoder {
    buffer: String,
}

impl PlainTextDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) -> Vec<SolverEvent> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();
        while let Some(end) = self.buffer.find('\n') {
            let line: String = self.buffer[..end].to_string();
            self.buffer.drain(..end + 1);
            if let Some(event) = parse_plain_line(line.trim_end_matches('\r')) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes a trailing line that arrived without a newline.
    pub fn finish(&mut self) -> Option<SolverEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_plain_line(rest.trim_end())
    }
}

fn parse_plain_line(line: &str) -> Option<SolverEvent> {
    if let Some(message) = line.strip_prefix("LOG: ") {
        Some(SolverEvent::Log {
            timestamp: event_timestamp(),
            level: "info".to_string(),
            stage: "solving".to_string(),
            message: message.to_string(),
            sequence: 0,
        })
    } else if let Some(payload) = line.strip_prefix("RESULT: ") {
        let solution: MipSolution = serde_json::from_str(payload).ok()?;
        Some(SolverEvent::Result {
            timestamp: event_timestamp(),
            solution,
            runtime_milliseconds: 0,
            sequence: 0,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn sample_events() -> Vec<SolverEvent> {
        vec![
            SolverEvent::Log {
                timestamp: "2024-01-01T00:00:00.000Z".to_string(),
                level: "info".to_string(),
                stage: "presolve".to_string(),
                message: "presolving model".to_string(),
                sequence: 1,
            },
            SolverEvent::Metric {
                timestamp: "2024-01-01T00:00:01.000Z".to_string(),
                objective_value: 1.5,
                gap: 0.0,
                iteration: 3,
                sequence: 2,
            },
            SolverEvent::Result {
                timestamp: "2024-01-01T00:00:02.000Z".to_string(),
                solution: sample_solution(),
                runtime_milliseconds: 2000,
                sequence: 3,
            },
            SolverEvent::End { success: true },
        ]
    }

    fn sample_solution() -> MipSolution {
        MipSolution {
            name: "p".to_string(),
            status: "optimal".to_string(),
            objective_value: Some(1.5),
            variables: IndexMap::from([("x".to_string(), 1.0)]),
            diagnostics: None,
        }
    }

    #[test]
    fn sse_frame_shape() {
        let frame = encode_sse(&SolverEvent::End { success: true }).unwrap();
        assert_eq!(frame, "event: end\ndata: {\"type\":\"end\",\"success\":true}\n\n");
    }

    #[test]
    fn sse_round_trip_every_kind() {
        let mut decoder = SseDecoder::new();
        for event in sample_events() {
            let frame = encode_sse(&event).unwrap();
            let decoded = decoder.push(&frame);
            assert_eq!(decoded, vec![event]);
        }
    }

    #[test]
    fn sse_decoder_handles_arbitrary_chunk_splits() {
        let events = sample_events();
        let stream: String = events
            .iter()
            .map(|e| encode_sse(e).unwrap())
            .collect();

        // Byte-at-a-time is the worst case.
        let mut decoder = SseDecoder::new();
        let mut decoded = Vec::new();
        for ch in stream.chars() {
            decoded.extend(decoder.push(&ch.to_string()));
        }
        assert_eq!(decoded, events);
    }

    #[test]
    fn sse_decoder_skips_unknown_kinds() {
        let mut decoder = SseDecoder::new();
        let decoded = decoder.push("event: heartbeat\ndata: {}\n\nevent: end\ndata: {\"type\":\"end\",\"success\":false}\n\n");
        assert_eq!(decoded, vec![SolverEvent::End { success: false }]);
    }

    #[test]
    fn sse_decoder_skips_malformed_data() {
        let mut decoder = SseDecoder::new();
        let decoded = decoder.push("event: log\ndata: {not json\n\n");
        assert!(decoded.is_empty());
        // The decoder keeps working afterwards.
        let decoded = decoder.push(&encode_sse(&SolverEvent::End { success: true }).unwrap());
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn plain_log_round_trips() {
        let mut decoder = PlainTextDecoder::new();
        let decoded = decoder.push("LOG: presolving model\n");
        assert_eq!(decoded.len(), 1);
        let re_encoded = encode_plain(&decoded[0]).unwrap().unwrap();
        assert_eq!(re_encoded, "LOG: presolving model\n");
    }

    #[test]
    fn plain_result_round_trips() {
        let event = SolverEvent::Result {
            timestamp: "2024-01-01T00:00:02.000Z".to_string(),
            solution: sample_solution(),
            runtime_milliseconds: 2000,
            sequence: 3,
        };
        let line = encode_plain(&event).unwrap().unwrap();
        let mut decoder = PlainTextDecoder::new();
        let decoded = decoder.push(&line);
        assert_eq!(decoded.len(), 1);
        match &decoded[0] {
            SolverEvent::Result { solution, .. } => assert_eq!(*solution, sample_solution()),
            other => panic!("expected result, got {other:?}"),
        }
        assert_eq!(encode_plain(&decoded[0]).unwrap().unwrap(), line);
    }

    #[test]
    fn plain_end_has_no_frame() {
        assert_eq!(encode_plain(&SolverEvent::End { success: true }).unwrap(), None);
    }

    #[test]
    fn plain_decoder_buffers_partial_lines() {
        let mut decoder = PlainTextDecoder::new();
        assert!(decoder.push("LOG: part").is_empty());
        let decoded = decoder.push("ial line\nLOG: trailing");
        assert_eq!(decoded.len(), 1);
        match &decoded[0] {
            SolverEvent::Log { message, .. } => assert_eq!(message, "partial line"),
            other => panic!("expected log, got {other:?}"),
        }
        let last = decoder.finish().unwrap();
        match last {
            SolverEvent::Log { ref message, .. } => assert_eq!(message, "trailing"),
            other => panic!("expected log, got {other:?}"),
        }
    }

    #[test]
    fn plain_decoder_ignores_unprefixed_lines() {
        let mut decoder = PlainTextDecoder::new();
        assert!(decoder.push("random noise\n").is_empty());
        assert!(decoder.finish().is_none());
    }
}
