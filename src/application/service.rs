//! Service facade over the orchestrator.
//!
//! One instance per request; it wires the engine factory to the
//! orchestrator and offers the two consumption shapes: a live event stream
//! and a buffered solve that drives the stream internally.

use futures::StreamExt;

use crate::application::orchestrator::{SolveError, SolveOrchestrator};
use crate::domain::events::SolverEvent;
use crate::domain::models::{MipProblem, MipSolution};
use crate::solver::EngineFactory;

pub struct MipSolverService;

impl MipSolverService {
    pub fn new() -> Self {
        Self
    }

    /// Builds the native model for one solve. Schema and build failures are
    /// synchronous; no event stream exists yet.
    pub fn begin(
        &self,
        problem: MipProblem,
        time_limit_secs: Option<f64>,
    ) -> Result<SolveOrchestrator, SolveError> {
        let engine = EngineFactory::default_engine();
        tracing::info!(
            problem = problem.name(),
            variables = problem.num_variables(),
            integer_variables = problem.num_integer_variables(),
            constraints = problem.constraints.len(),
            engine = engine.name(),
            "starting solve"
        );
        SolveOrchestrator::build(engine, problem, time_limit_secs)
    }

    /// Buffered solve: drives the event stream to exhaustion and returns the
    /// terminal solution. The last result seen wins; a stream that ends
    /// without one yields a "not solved" solution rather than an error.
    pub async fn solve(
        &self,
        problem: MipProblem,
        time_limit_secs: Option<f64>,
    ) -> Result<MipSolution, SolveError> {
        let orchestrator = self.begin(problem, time_limit_secs)?;
        let name = orchestrator.problem_name().to_string();
        let stream = orchestrator.run();
        futures::pin_mut!(stream);

        let mut solution = None;
        while let Some(event) = stream.next().await {
            if let SolverEvent::Result { solution: s, .. } = event {
                solution = Some(s);
            }
        }
        Ok(solution.unwrap_or_else(|| MipSolution::not_solved(name)))
    }
}

impl Default for MipSolverService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Coefficient, Constraint, Variable};
    use crate::domain::value_objects::ConstraintSense;

    #[tokio::test]
    async fn buffered_solve_returns_the_terminal_solution() {
        let problem = MipProblem::maximize("binary_max")
            .add_variable(Variable::binary("x"))
            .add_objective_term("x", 1.0);
        let solution = MipSolverService::new().solve(problem, None).await.unwrap();
        assert_eq!(solution.status, "optimal");
        let objective = solution.objective_value.unwrap();
        assert!((objective - 1.0).abs() < 1e-6);
        let x = solution.variables["x"];
        assert!((x - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn buffered_solve_reports_infeasibility_with_diagnostics() {
        let problem = MipProblem::minimize("contradiction")
            .add_variable(Variable::continuous("x").with_bounds(Some(0.0), None))
            .add_objective_term("x", 1.0)
            .add_constraint(
                Constraint::new(
                    ConstraintSense::LessOrEqual,
                    vec![Coefficient::new("x", 1.0)],
                )
                .with_name("upper")
                .with_rhs(0.0),
            )
            .add_constraint(
                Constraint::new(
                    ConstraintSense::GreaterOrEqual,
                    vec![Coefficient::new("x", 1.0)],
                )
                .with_name("lower")
                .with_rhs(1.0),
            );

        let solution = MipSolverService::new().solve(problem, None).await.unwrap();
        assert_eq!(solution.status, "infeasible");
        assert_eq!(solution.objective_value, None);
        let diagnostics = solution.diagnostics.expect("diagnostics for infeasible solve");
        assert!(!diagnostics.violated_constraints.is_empty());
    }

    #[tokio::test]
    async fn schema_error_is_reported_before_any_stream() {
        let problem = MipProblem::minimize("dangling").add_objective_term("ghost", 1.0);
        let error = MipSolverService::new().solve(problem, None).await.unwrap_err();
        assert!(matches!(error, SolveError::Schema(_)));
    }
}
