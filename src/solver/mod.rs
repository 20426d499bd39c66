pub mod factory;
pub mod good_lp_engine;

pub use factory::{EngineFactory, SolverInfo};
pub use good_lp_engine::GoodLpEngine;
