//! Typed solver events streamed during one solve.
//!
//! Events are a closed tagged union ordered by an orchestrator-assigned
//! sequence number, strictly increasing from 1 within one solve. `end` is
//! the terminal marker and carries no sequence.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::models::MipSolution;

/// Discriminated solver event. The wire tag is the lowercase kind name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SolverEvent {
    Log {
        timestamp: String,
        level: String,
        stage: String,
        message: String,
        sequence: u64,
    },
    Metric {
        timestamp: String,
        /// Current best objective value; infinite while no incumbent exists.
        #[serde(with = "nullable_infinity")]
        objective_value: f64,
        /// Relative optimality gap; infinite while unbounded from above.
        #[serde(with = "nullable_infinity")]
        gap: f64,
        iteration: u64,
        sequence: u64,
    },
    Result {
        timestamp: String,
        solution: MipSolution,
        runtime_milliseconds: u64,
        sequence: u64,
    },
    End {
        success: bool,
    },
}

impl SolverEvent {
    /// Wire kind, also used as the SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            SolverEvent::Log { .. } => "log",
            SolverEvent::Metric { .. } => "metric",
            SolverEvent::Result { .. } => "result",
            SolverEvent::End { .. } => "end",
        }
    }

    pub fn sequence(&self) -> Option<u64> {
        match self {
            SolverEvent::Log { sequence, .. }
            | SolverEvent::Metric { sequence, .. }
            | SolverEvent::Result { sequence, .. } => Some(*sequence),
            SolverEvent::End { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SolverEvent::End { .. })
    }
}

/// RFC 3339 UTC timestamp for event stamping.
pub fn event_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// JSON has no `Infinity`: non-finite metric values encode as `null` and
/// decode back to positive infinity.
mod nullable_infinity {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
