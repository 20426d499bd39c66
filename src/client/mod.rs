pub mod solver;

pub use solver::{SolverClient, StreamMode};
