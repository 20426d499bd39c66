// Domain layer: wire schema, events, and the engine capability boundary
pub mod domain;

// Application layer: solve orchestration and the service facade
pub mod application;

// Event framing for the supported transport modes
pub mod streaming;

// Infrastructure layer: HTTP surface and server lifecycle
pub mod infrastructure;

// Solver adapters: concrete implementations of the Engine trait
pub mod solver;

// Client-side stream consumer
pub mod client;

// Re-export commonly used types
pub use application::{MipSolverService, SolveError, SolveOrchestrator};
pub use client::{SolverClient, StreamMode};
pub use domain::{
    Coefficient, Constraint, ConstraintSense, Diagnostics, Engine, EngineError, MipProblem,
    MipSolution, ObjectiveSense, SchemaError, SolveStatus, SolverEvent, Variable,
    VariableCategory,
};
pub use infrastructure::{router, start_server, ServerConfig};
pub use solver::{EngineFactory, GoodLpEngine, SolverInfo};
