//! Engine adapter over good_lp.
//!
//! The backend is chosen at compile time: microlp (pure Rust) by default,
//! COIN-OR CBC or HiGHS behind the `coin-cbc` / `highs` cargo features.
//! good_lp exposes no SOS construct, so SOS groups are rejected at build
//! time, and no mid-solve callback, so interrupts take effect at the
//! adapter's checkpoints and progress output is emitted around the solve.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use good_lp::{
    default_solver, variable, variables, Expression, ProblemVariables, ResolutionError,
    Solution as GoodLpSolution, SolverModel, Variable as LpVariable,
};

use crate::domain::engine::{Engine, EngineError, EngineInterrupt, InterruptFlag, Result};
use crate::domain::models::MipProblem;
use crate::domain::value_objects::{ConstraintSense, ObjectiveSense, VariableCategory};

pub struct GoodLpEngine {
    interrupt: Arc<InterruptFlag>,
    pending_parameters: Vec<String>,
    model: Option<BuiltModel>,
    outcome: Option<SolveOutcome>,
}

struct BuiltModel {
    problem_name: String,
    vars: ProblemVariables,
    handles: Vec<LpVariable>,
    var_names: Vec<String>,
    objective: Expression,
    objective_terms: Vec<(usize, f64)>,
    sense: ObjectiveSense,
    constraints: Vec<PreparedConstraint>,
    num_binary: usize,
    num_integer: usize,
    num_continuous: usize,
}

struct PreparedConstraint {
    expr: Expression,
    sense: ConstraintSense,
    rhs: f64,
}

struct SolveOutcome {
    status: String,
    objective: Option<f64>,
    values: HashMap<String, f64>,
    solve_time: Duration,
}

impl GoodLpEngine {
    pub fn new() -> Self {
        Self {
            interrupt: InterruptFlag::new(),
            pending_parameters: Vec::new(),
            model: None,
            outcome: None,
        }
    }

    fn backend() -> &'static str {
        if cfg!(feature = "coin-cbc") {
            "COIN-OR CBC"
        } else if cfg!(feature = "highs") {
            "HiGHS"
        } else {
            "microlp"
        }
    }
}

impl Default for GoodLpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for GoodLpEngine {
    fn name(&self) -> &'static str {
        Self::backend()
    }

    fn version(&self) -> &'static str {
        if cfg!(feature = "coin-cbc") {
            "2.10+"
        } else if cfg!(feature = "highs") {
            "1.7+"
        } else {
            "0.2"
        }
    }

    fn build(&mut self, problem: &MipProblem) -> Result<()> {
        if !problem.sos1.is_empty() || !problem.sos2.is_empty() {
            return Err(EngineError::Unsupported {
                engine: self.name(),
                feature: "SOS constraints".to_string(),
            });
        }

        let mut vars = variables!();
        let mut handles: Vec<LpVariable> = Vec::with_capacity(problem.variables.len());
        let mut var_names = Vec::with_capacity(problem.variables.len());
        let mut index_of: HashMap<&str, usize> = HashMap::new();
        let mut num_binary = 0;
        let mut num_integer = 0;
        let mut num_continuous = 0;

        for (index, var) in problem.variables.iter().enumerate() {
            let mut definition = variable();
            match var.category {
                VariableCategory::Binary => {
                    num_binary += 1;
                    definition = definition
                        .integer()
                        .min(var.lower_bound.unwrap_or(0.0))
                        .max(var.upper_bound.unwrap_or(1.0));
                }
                VariableCategory::Integer => {
                    num_integer += 1;
                    definition = definition.integer();
                    if let Some(lower) = var.lower_bound {
                        definition = definition.min(lower);
                    }
                    if let Some(upper) = var.upper_bound {
                        definition = definition.max(upper);
                    }
                }
                VariableCategory::Continuous => {
                    num_continuous += 1;
                    if let Some(lower) = var.lower_bound {
                        definition = definition.min(lower);
                    }
                    if let Some(upper) = var.upper_bound {
                        definition = definition.max(upper);
                    }
                }
            }
            handles.push(vars.add(definition));
            var_names.push(var.name.clone());
            index_of.insert(var.name.as_str(), index);
        }

        let mut objective: Expression = 0.into();
        let mut objective_terms = Vec::new();
        for coeff in &problem.objective.coefficients {
            // validate() already checked the reference exists
            if let Some(&index) = index_of.get(coeff.name.as_str()) {
                if coeff.value != 0.0 {
                    objective += coeff.value * handles[index];
                    objective_terms.push((index, coeff.value));
                }
            }
        }

        let mut constraints = Vec::with_capacity(problem.constraints.len());
        for constraint in &problem.constraints {
            let mut expr: Expression = 0.into();
            for coeff in &constraint.coefficients {
                if let Some(&index) = index_of.get(coeff.name.as_str()) {
                    if coeff.value != 0.0 {
                        expr += coeff.value * handles[index];
                    }
                }
            }
            constraints.push(PreparedConstraint {
                expr,
                sense: constraint.sense,
                rhs: constraint.rhs(),
            });
        }

        self.model = Some(BuiltModel {
            problem_name: problem.name().to_string(),
            vars,
            handles,
            var_names,
            objective,
            objective_terms,
            sense: problem.objective_sense(),
            constraints,
            num_binary,
            num_integer,
            num_continuous,
        });
        Ok(())
    }

    fn set_parameter(&mut self, key: &str, value: &serde_json::Value) {
        // good_lp exposes no generic parameter interface; remembered only to
        // report them as ignored in the progress output.
        self.pending_parameters.push(format!("{key}={value}"));
    }

    fn interrupter(&self) -> Arc<dyn EngineInterrupt> {
        self.interrupt.clone()
    }

    fn optimize(&mut self, sink: &mut dyn FnMut(String)) -> Result<()> {
        let model = self
            .model
            .take()
            .ok_or_else(|| EngineError::Failed("optimize called before build".to_string()))?;

        sink(format!(
            "presolving model '{}': {} variables ({} binary, {} integer, {} continuous), {} constraints",
            model.problem_name,
            model.handles.len(),
            model.num_binary,
            model.num_integer,
            model.num_continuous,
            model.constraints.len(),
        ));
        sink(format!("objective sense: {}", model.sense));
        for parameter in self.pending_parameters.drain(..) {
            sink(format!(
                "parameter {parameter} not supported by {}, ignored",
                Self::backend()
            ));
        }

        if self.interrupt.is_interrupted() {
            sink("solve interrupted by user before start".to_string());
            self.outcome = Some(SolveOutcome {
                status: "userinterrupt".to_string(),
                objective: None,
                values: HashMap::new(),
                solve_time: Duration::ZERO,
            });
            return Ok(());
        }

        let BuiltModel {
            vars,
            handles,
            var_names,
            objective,
            objective_terms,
            sense,
            constraints,
            ..
        } = model;

        let unsolved = match sense {
            ObjectiveSense::Minimize => vars.minimise(objective),
            ObjectiveSense::Maximize => vars.maximise(objective),
        };
        let mut solver_model = unsolved.using(default_solver);
        for prepared in &constraints {
            let constraint = match prepared.sense {
                ConstraintSense::LessOrEqual => prepared.expr.clone().leq(prepared.rhs),
                ConstraintSense::Equal => prepared.expr.clone().eq(prepared.rhs),
                ConstraintSense::GreaterOrEqual => prepared.expr.clone().geq(prepared.rhs),
            };
            solver_model = solver_model.with(constraint);
        }

        let started = Instant::now();
        let resolution = solver_model.solve();
        let solve_time = started.elapsed();

        let outcome = match resolution {
            Ok(solution) => {
                let values: HashMap<String, f64> = var_names
                    .iter()
                    .zip(&handles)
                    .map(|(name, handle)| (name.clone(), solution.value(*handle)))
                    .collect();
                let objective_value: f64 = objective_terms
                    .iter()
                    .map(|(index, coeff)| coeff * solution.value(handles[*index]))
                    .sum();
                sink(format!(
                    " {:.1}s|{:>8} | {:>13.6e} | {:>6.2}%",
                    solve_time.as_secs_f64(),
                    1,
                    objective_value,
                    0.0,
                ));
                sink("solving finished: status = optimal".to_string());
                SolveOutcome {
                    status: "optimal".to_string(),
                    objective: Some(objective_value),
                    values,
                    solve_time,
                }
            }
            Err(ResolutionError::Infeasible) => {
                sink("problem is infeasible".to_string());
                SolveOutcome {
                    status: "infeasible".to_string(),
                    objective: None,
                    values: HashMap::new(),
                    solve_time,
                }
            }
            Err(ResolutionError::Unbounded) => {
                sink("problem is unbounded".to_string());
                SolveOutcome {
                    status: "unbounded".to_string(),
                    objective: None,
                    values: HashMap::new(),
                    solve_time,
                }
            }
            Err(other) => {
                return Err(EngineError::Failed(format!("{other:?}")));
            }
        };

        self.outcome = Some(outcome);
        Ok(())
    }

    fn status_string(&self) -> String {
        self.outcome
            .as_ref()
            .map(|o| o.status.clone())
            .unwrap_or_else(|| "not solved".to_string())
    }

    fn objective_value(&self) -> Option<f64> {
        self.outcome.as_ref().and_then(|o| o.objective)
    }

    fn has_solution(&self) -> bool {
        self.outcome
            .as_ref()
            .is_some_and(|o| o.objective.is_some())
    }

    fn solution_values(&self) -> HashMap<String, f64> {
        self.outcome
            .as_ref()
            .map(|o| o.values.clone())
            .unwrap_or_default()
    }

    fn solving_time(&self) -> Duration {
        self.outcome
            .as_ref()
            .map(|o| o.solve_time)
            .unwrap_or(Duration::ZERO)
    }
}
