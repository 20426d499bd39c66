//! Solve orchestration: the lifecycle of one solve.
//!
//! States run `Building -> Running -> {Completed, Interrupted, Failed}`.
//! Building translates the wire problem into the engine's native model and
//! fails synchronously, before any event exists. Running executes the
//! blocking optimize on a dedicated blocking task; its textual output flows
//! back through a bounded single-producer/single-consumer queue that the
//! async side polls with a short timeout, so interrupt checks interleave
//! between events. Every solve gets a fresh sequence counter starting at 1.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use indexmap::IndexMap;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::application::classifier::ProgressClassifier;
use crate::domain::engine::{Engine, EngineError, EngineInterrupt};
use crate::domain::events::{event_timestamp, SolverEvent};
use crate::domain::models::{
    Diagnostics, MipProblem, MipSolution, SchemaError, ViolatedConstraint,
};
use crate::domain::value_objects::ConstraintSense;

const LINE_QUEUE_DEPTH: usize = 256;
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const VIOLATION_TOLERANCE: f64 = 1e-6;

/// Pre-stream failure: either the caller's problem is malformed or the
/// engine rejected the model. Both are reported synchronously.
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Idempotent cancellation handle for one solve. The first call asks the
/// engine to stop at its next checkpoint; later calls are no-ops.
#[derive(Clone)]
pub struct InterruptHandle {
    engine: Arc<dyn EngineInterrupt>,
    fired: Arc<AtomicBool>,
}

impl InterruptHandle {
    fn new(engine: Arc<dyn EngineInterrupt>) -> Self {
        Self {
            engine,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn interrupt(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            tracing::info!("interrupt requested, asking solver to stop");
            self.engine.interrupt();
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.engine.is_interrupted()
    }
}

/// Owns one solve from model construction to the terminal event pair.
/// Constructed per request; nothing survives across solves.
pub struct SolveOrchestrator {
    engine: Box<dyn Engine>,
    problem: MipProblem,
    interrupt: Arc<dyn EngineInterrupt>,
}

impl std::fmt::Debug for SolveOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolveOrchestrator")
            .field("problem", &self.problem)
            .finish_non_exhaustive()
    }
}

impl SolveOrchestrator {
    /// Building phase: validates the problem and constructs the native
    /// model. Engine parameters come from the problem's `solver_options`
    /// plus the best-effort request time limit.
    pub fn build(
        mut engine: Box<dyn Engine>,
        problem: MipProblem,
        time_limit_secs: Option<f64>,
    ) -> Result<Self, SolveError> {
        problem.validate()?;

        if let Some(options) = &problem.solver_options {
            for (key, value) in options {
                engine.set_parameter(key, value);
            }
        }
        if let Some(secs) = time_limit_secs {
            engine.set_parameter("limits/time", &serde_json::Value::from(secs));
        }

        engine.build(&problem)?;
        let interrupt = engine.interrupter();
        Ok(Self {
            engine,
            problem,
            interrupt,
        })
    }

    pub fn problem_name(&self) -> &str {
        self.problem.name()
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle::new(self.interrupt.clone())
    }

    /// Running phase. Consumes the orchestrator and yields the event
    /// sequence for this solve. The engine is moved onto a blocking task and
    /// owned there until it finishes; lines stream back through the queue.
    pub fn run(self) -> impl Stream<Item = SolverEvent> + Send {
        let Self {
            mut engine,
            problem,
            interrupt,
        } = self;

        async_stream::stream! {
            let (line_tx, mut line_rx) = mpsc::channel::<String>(LINE_QUEUE_DEPTH);

            let solver = tokio::task::spawn_blocking(move || {
                let mut sink = |line: String| {
                    let _ = line_tx.blocking_send(line);
                };
                let outcome = engine.optimize(&mut sink);
                outcome.map(|()| extract_solution(engine.as_ref(), &problem))
            });

            let mut classifier = ProgressClassifier::new();
            let mut interrupted = false;
            loop {
                if interrupt.is_interrupted() {
                    interrupted = true;
                    break;
                }
                match timeout(POLL_INTERVAL, line_rx.recv()).await {
                    Ok(Some(line)) => {
                        if let Some(event) = classifier.next_event(&line) {
                            yield event;
                        }
                    }
                    // Producer dropped the sender: output capture is done.
                    Ok(None) => break,
                    // Poll tick, loop back to the interrupt check.
                    Err(_) => {}
                }
            }

            if interrupted {
                // Drain what the engine already wrote, then close. No result
                // is guaranteed on this path; the solver task winds down in
                // the background and its model is dropped with it.
                while let Ok(line) = line_rx.try_recv() {
                    if let Some(event) = classifier.next_event(&line) {
                        yield event;
                    }
                }
                tracing::info!("solve interrupted");
                yield SolverEvent::End { success: false };
                return;
            }

            match solver.await {
                Ok(Ok((solution, runtime_milliseconds))) => {
                    tracing::info!(status = %solution.status, runtime_milliseconds, "solve completed");
                    yield SolverEvent::Result {
                        timestamp: event_timestamp(),
                        solution,
                        runtime_milliseconds,
                        sequence: classifier.take_sequence(),
                    };
                    yield SolverEvent::End { success: true };
                }
                Ok(Err(error)) => {
                    // Failed: already-flushed events stay valid, but the
                    // stream ends without a terminal marker. Consumers treat
                    // an endless stream as unsolved.
                    tracing::error!(%error, "engine failed during optimize");
                }
                Err(join_error) => {
                    tracing::error!(%join_error, "solver task died");
                }
            }
        }
    }
}

fn extract_solution(engine: &dyn Engine, problem: &MipProblem) -> (MipSolution, u64) {
    let status = engine.status_string();
    let values = engine.solution_values();
    let runtime_milliseconds = engine.solving_time().as_millis() as u64;

    let mut solution = MipSolution {
        name: problem.name().to_string(),
        status,
        objective_value: None,
        variables: ordered_values(problem, &values),
        diagnostics: None,
    };

    if solution.status == "infeasible" {
        solution.diagnostics = Some(diagnose_infeasibility(
            problem,
            &values,
            &engine.constraint_duals(),
            engine.infeasible_subsystem(),
        ));
    } else if engine.has_solution() {
        solution.objective_value = engine.objective_value();
    } else {
        solution.variables.clear();
    }

    (solution, runtime_milliseconds)
}

fn ordered_values(problem: &MipProblem, values: &HashMap<String, f64>) -> IndexMap<String, f64> {
    problem
        .variables
        .iter()
        .filter_map(|v| values.get(&v.name).map(|value| (v.name.clone(), *value)))
        .collect()
}

/// Derives infeasibility diagnostics from the relaxation state the engine
/// already has: constraint activities at the last known variable values
/// (0.0 when unknown), violations beyond the tolerance, and Farkas duals
/// where the engine supplied them.
pub fn diagnose_infeasibility(
    problem: &MipProblem,
    values: &HashMap<String, f64>,
    farkas: &HashMap<String, f64>,
    irreducible_infeasible_set: Vec<String>,
) -> Diagnostics {
    let value_of = |name: &str| values.get(name).copied().unwrap_or(0.0);

    let mut violated_constraints = Vec::new();
    let mut dual_values = IndexMap::new();
    for (index, constraint) in problem.constraints.iter().enumerate() {
        let label = constraint.label(index);
        let activity: f64 = constraint
            .coefficients
            .iter()
            .map(|term| term.value * value_of(&term.name))
            .sum();
        let rhs = constraint.rhs();

        let violation = match constraint.sense {
            ConstraintSense::LessOrEqual => (activity - rhs).max(0.0),
            ConstraintSense::GreaterOrEqual => (rhs - activity).max(0.0),
            ConstraintSense::Equal => (activity - rhs).abs(),
        };
        if violation > VIOLATION_TOLERANCE {
            violated_constraints.push(ViolatedConstraint {
                name: label.clone(),
                violation_amount: violation,
                left_hand_side: activity,
                right_hand_side: rhs,
                sense: constraint.sense.letter().to_string(),
            });
        }

        dual_values.insert(label.clone(), farkas.get(&label).copied().unwrap_or(0.0));
    }

    Diagnostics {
        violated_constraints,
        irreducible_infeasible_set,
        dual_values,
    }
}
