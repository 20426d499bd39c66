//! Classification of engine progress output.
//!
//! Engines report progress as text. Tabular display rows (pipe-separated
//! numeric columns: time, node count, bounds, gap) become `metric` events;
//! everything else becomes a `log` event. Classification is a pure function
//! over one line, deliberately decoupled from I/O so it can be tested
//! against captured output.

use crate::domain::events::{event_timestamp, SolverEvent};

/// Outcome of classifying one line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineClass {
    Metric {
        iteration: u64,
        objective_value: f64,
        gap: f64,
    },
    Log,
}

/// Classifies a single progress line.
///
/// A line with at least three column separators is treated as a candidate
/// progress row; if its columns do not parse it degrades to `Log` rather
/// than being dropped.
pub fn classify(line: &str) -> LineClass {
    if line.matches('|').count() < 3 {
        return LineClass::Log;
    }
    match parse_progress_row(line) {
        Some((iteration, objective_value, gap)) => LineClass::Metric {
            iteration,
            objective_value,
            gap,
        },
        None => LineClass::Log,
    }
}

fn parse_progress_row(line: &str) -> Option<(u64, f64, f64)> {
    let columns: Vec<&str> = line
        .split('|')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if columns.len() < 4 {
        return None;
    }

    // Incumbent rows may carry a leading marker such as '*'.
    let time_column = columns[0].trim_start_matches('*').trim();
    time_column.strip_suffix('s').unwrap_or(time_column).trim().parse::<f64>().ok()?;

    let iteration = columns[1].parse::<u64>().ok()?;

    let gap_index = columns.iter().rposition(|c| c.ends_with('%'))?;
    let gap = parse_bound(columns[gap_index].trim_end_matches('%'))?;

    // The primal bound is the rightmost numeric column before the gap.
    let objective_value = columns[2..gap_index].iter().rev().find_map(|c| parse_bound(c))?;

    Some((iteration, objective_value, gap))
}

fn parse_bound(column: &str) -> Option<f64> {
    let column = column.trim();
    match column {
        "--" | "-" | "Inf" | "inf" => Some(f64::INFINITY),
        _ => column.parse::<f64>().ok(),
    }
}

fn infer_level(line: &str) -> &'static str {
    let lowered = line.to_ascii_lowercase();
    if lowered.contains("error") {
        "error"
    } else if lowered.contains("warning") {
        "warning"
    } else {
        "info"
    }
}

/// Stateful wrapper that turns classified lines into sequenced events.
///
/// Stage is inferred from position in the output: `presolve` until the first
/// metric row, `solving` afterwards. Sequence numbers start at 1 and are
/// never reused within one solve.
pub struct ProgressClassifier {
    next_sequence: u64,
    saw_metric: bool,
}

impl ProgressClassifier {
    pub fn new() -> Self {
        Self {
            next_sequence: 1,
            saw_metric: false,
        }
    }

    /// Consumes one raw output line, producing the next sequenced event.
    /// Blank lines produce nothing.
    pub fn next_event(&mut self, line: &str) -> Option<SolverEvent> {
        let line = line.trim_end();
        if line.trim().is_empty() {
            return None;
        }
        let event = match classify(line) {
            LineClass::Metric {
                iteration,
                objective_value,
                gap,
            } => {
                self.saw_metric = true;
                SolverEvent::Metric {
                    timestamp: event_timestamp(),
                    objective_value,
                    gap,
                    iteration,
                    sequence: self.take_sequence(),
                }
            }
            LineClass::Log => SolverEvent::Log {
                timestamp: event_timestamp(),
                level: infer_level(line).to_string(),
                stage: if self.saw_metric { "solving" } else { "presolve" }.to_string(),
                message: line.to_string(),
                sequence: self.take_sequence(),
            },
        };
        Some(event)
    }

    /// Hands out the next sequence number (used for the terminal `result`).
    pub fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

impl Default for ProgressClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDE_ROW: &str = " 0.2s|     1 |     0 |  1045 |   - |  12M |   0 |  45 |  80 |  80 \
                            |  45 |  0 |  0 |  0 | 4.500000e+01 | 6.000000e+01 |  33.33%| unknown";

    #[test]
    fn wide_progress_row_is_a_metric() {
        let class = classify(WIDE_ROW);
        assert_eq!(
            class,
            LineClass::Metric {
                iteration: 1,
                objective_value: 60.0,
                gap: 33.33,
            }
        );
    }

    #[test]
    fn narrow_progress_row_is_a_metric() {
        let class = classify("  0.0s|       1 |  1.000000e0 |   0.00%");
        assert_eq!(
            class,
            LineClass::Metric {
                iteration: 1,
                objective_value: 1.0,
                gap: 0.0,
            }
        );
    }

    #[test]
    fn incumbent_marker_and_infinite_bounds_parse() {
        let class = classify("* 1.5s|    12 |   -- |    Inf%");
        assert_eq!(
            class,
            LineClass::Metric {
                iteration: 12,
                objective_value: f64::INFINITY,
                gap: f64::INFINITY,
            }
        );
    }

    #[test]
    fn header_row_degrades_to_log() {
        let header = " time | node | left |LP iter| gap ";
        assert_eq!(classify(header), LineClass::Log);
    }

    #[test]
    fn seemingly_tabular_garbage_degrades_to_log() {
        assert_eq!(classify("a|b|c|d%"), LineClass::Log);
        // Pipes but no gap column at all.
        assert_eq!(classify(" 0.1s| 3 | 4.0 | 5.0 "), LineClass::Log);
    }

    #[test]
    fn ordinary_text_is_a_log() {
        assert_eq!(classify("presolving model"), LineClass::Log);
    }

    #[test]
    fn stage_flips_after_first_metric() {
        let mut classifier = ProgressClassifier::new();
        let first = classifier.next_event("presolving 3 variables").unwrap();
        match &first {
            SolverEvent::Log { stage, sequence, .. } => {
                assert_eq!(stage, "presolve");
                assert_eq!(*sequence, 1);
            }
            other => panic!("expected log, got {other:?}"),
        }

        let metric = classifier.next_event(WIDE_ROW).unwrap();
        assert_eq!(metric.sequence(), Some(2));
        assert_eq!(metric.kind(), "metric");

        let later = classifier.next_event("cuts applied").unwrap();
        match &later {
            SolverEvent::Log { stage, sequence, .. } => {
                assert_eq!(stage, "solving");
                assert_eq!(*sequence, 3);
            }
            other => panic!("expected log, got {other:?}"),
        }
    }

    #[test]
    fn blank_lines_produce_nothing_and_burn_no_sequence() {
        let mut classifier = ProgressClassifier::new();
        assert!(classifier.next_event("   ").is_none());
        assert!(classifier.next_event("").is_none());
        let event = classifier.next_event("message").unwrap();
        assert_eq!(event.sequence(), Some(1));
    }

    #[test]
    fn level_is_inferred_from_the_line() {
        let mut classifier = ProgressClassifier::new();
        match classifier.next_event("WARNING: numerical trouble").unwrap() {
            SolverEvent::Log { level, .. } => assert_eq!(level, "warning"),
            other => panic!("expected log, got {other:?}"),
        }
        match classifier.next_event("read error on column file").unwrap() {
            SolverEvent::Log { level, .. } => assert_eq!(level, "error"),
            other => panic!("expected log, got {other:?}"),
        }
    }
}
