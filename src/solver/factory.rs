use serde::{Deserialize, Serialize};

use crate::domain::engine::Engine;
use crate::solver::GoodLpEngine;

/// Static capability descriptor served by `/solver-info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverInfo {
    pub solver: String,
    pub version: String,
}

/// Creates engine instances. Every solve gets a fresh engine; nothing is
/// shared across requests.
pub struct EngineFactory;

impl EngineFactory {
    pub fn default_engine() -> Box<dyn Engine> {
        Box::new(GoodLpEngine::new())
    }

    pub fn descriptor() -> SolverInfo {
        let engine = GoodLpEngine::new();
        SolverInfo {
            solver: engine.name().to_string(),
            version: engine.version().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_names_the_compiled_backend() {
        let info = EngineFactory::descriptor();
        assert!(!info.solver.is_empty());
        assert!(!info.version.is_empty());
    }
}
