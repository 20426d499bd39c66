pub mod engine;
pub mod events;
pub mod models;
pub mod value_objects;

pub use engine::{Engine, EngineError, EngineInterrupt};
pub use events::SolverEvent;
pub use models::{
    Coefficient, Constraint, Diagnostics, MipProblem, MipSolution, Objective, Parameters,
    SchemaError, SosGroup, Variable, ViolatedConstraint,
};
pub use value_objects::{ConstraintSense, ObjectiveSense, SolveStatus, VariableCategory};
