// Capability interface for optimization engines.
//
// The pipeline never sees a concrete solver: anything that can build a model
// from a MipProblem, run a blocking optimize while pushing textual progress
// into a sink, and answer the post-solve queries below is substitutable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::models::MipProblem;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{engine} does not support {feature}")]
    Unsupported { engine: &'static str, feature: String },

    #[error("engine failure: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Cooperative stop switch for a running solve.
///
/// `interrupt` asks the engine to stop at its next safe checkpoint; it does
/// not guarantee immediate termination. Implementations must be idempotent.
pub trait EngineInterrupt: Send + Sync {
    fn interrupt(&self);
    fn is_interrupted(&self) -> bool;
}

/// Flag-based interrupt switch, sufficient for engines that poll a boolean
/// at their checkpoints.
#[derive(Debug, Default)]
pub struct InterruptFlag(AtomicBool);

impl InterruptFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl EngineInterrupt for InterruptFlag {
    fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An optimization engine behind the capability boundary.
///
/// Lifecycle: `build` once, then one blocking `optimize`; queries are only
/// meaningful after `optimize` returns. The engine is exclusively owned by
/// the background execution unit for the whole running phase, so the trait
/// needs `Send` but not `Sync`.
pub trait Engine: Send {
    fn name(&self) -> &'static str;

    fn version(&self) -> &'static str;

    /// Translates the wire problem into the engine's native model.
    fn build(&mut self, problem: &MipProblem) -> Result<()>;

    /// Best-effort engine parameter (e.g. a time limit). Unknown keys are
    /// ignored, never fatal.
    fn set_parameter(&mut self, key: &str, value: &serde_json::Value);

    /// Stop switch usable from other threads while `optimize` runs.
    fn interrupter(&self) -> Arc<dyn EngineInterrupt>;

    /// Runs the blocking, non-reentrant solve. Textual progress output is
    /// pushed line-by-line into `sink` as it is produced.
    fn optimize(&mut self, sink: &mut dyn FnMut(String)) -> Result<()>;

    /// Engine-native status string (e.g. "optimal", "infeasible",
    /// "timelimit"); mapped through the fixed status table downstream.
    fn status_string(&self) -> String;

    fn objective_value(&self) -> Option<f64>;

    /// Whether the engine found at least one feasible solution.
    fn has_solution(&self) -> bool;

    /// Per-variable values of the best known solution, or the last relaxation
    /// values when infeasible. May be empty.
    fn solution_values(&self) -> HashMap<String, f64>;

    fn solving_time(&self) -> Duration;

    /// Farkas dual values per constraint when infeasible. Engines that cannot
    /// supply them return an empty map; consumers default to 0.0.
    fn constraint_duals(&self) -> HashMap<String, f64> {
        HashMap::new()
    }

    /// Irreducible infeasible set, when the engine can natively produce one.
    fn infeasible_subsystem(&self) -> Vec<String> {
        Vec::new()
    }
}
