//! Wire schema for problems and solutions.
//!
//! The JSON shapes here are byte-compatible with existing deployments:
//! short legacy field names (`cat`, `lowBound`, `upBound`, `varValue`, `dj`)
//! on encode, with the long forms accepted as aliases on decode. Absent and
//! `null` are interchangeable for every optional field.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::value_objects::{ConstraintSense, ObjectiveSense, VariableCategory};

/// Malformed or self-inconsistent problem, rejected before any solve attempt.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("{context} references undeclared variable '{name}'")]
    UndeclaredVariable { context: String, name: String },
    #[error("objective must have at least one coefficient")]
    EmptyObjective,
}

/// Problem-level metadata carried verbatim on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub name: String,
    /// 1 = minimize, -1 = maximize
    pub sense: i32,
    pub status: i32,
    pub sol_status: i32,
}

/// One (variable, coefficient) term of a linear expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub name: String,
    pub value: f64,
}

impl Coefficient {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    #[serde(default)]
    pub name: Option<String>,
    pub coefficients: Vec<Coefficient>,
}

/// Decision variable declaration, plus the slots the solve writes back into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "cat", alias = "category")]
    pub category: VariableCategory,
    #[serde(rename = "lowBound", alias = "lower_bound", default)]
    pub lower_bound: Option<f64>,
    #[serde(rename = "upBound", alias = "upper_bound", default)]
    pub upper_bound: Option<f64>,
    #[serde(rename = "varValue", alias = "value", default)]
    pub value: Option<f64>,
    #[serde(rename = "dj", alias = "reduced_cost", default)]
    pub reduced_cost: Option<f64>,
}

impl Variable {
    pub fn continuous(name: impl Into<String>) -> Self {
        Self::new(name, VariableCategory::Continuous)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, VariableCategory::Integer)
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self::new(name, VariableCategory::Binary).with_bounds(Some(0.0), Some(1.0))
    }

    fn new(name: impl Into<String>, category: VariableCategory) -> Self {
        Self {
            name: name.into(),
            category,
            lower_bound: None,
            upper_bound: None,
            value: None,
            reduced_cost: None,
        }
    }

    pub fn with_bounds(mut self, lower: Option<f64>, upper: Option<f64>) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }
}

/// Linear constraint. The wire carries an additive `constant`, so the
/// right-hand side of `sum(coefficients) sense rhs` is `-constant`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(default)]
    pub name: Option<String>,
    pub sense: ConstraintSense,
    pub coefficients: Vec<Coefficient>,
    #[serde(default)]
    pub pi: Option<f64>,
    #[serde(default)]
    pub constant: Option<f64>,
}

impl Constraint {
    pub fn new(sense: ConstraintSense, coefficients: Vec<Coefficient>) -> Self {
        Self {
            name: None,
            sense,
            coefficients,
            pi: None,
            constant: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_rhs(mut self, rhs: f64) -> Self {
        self.constant = Some(-rhs);
        self
    }

    pub fn rhs(&self) -> f64 {
        -self.constant.unwrap_or(0.0)
    }

    /// Display name, stable even for unnamed constraints.
    pub fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("unnamed_constraint_{index}"),
        }
    }
}

/// Ordered variable → weight mapping of one SOS group.
pub type SosGroup = IndexMap<String, f64>;

/// Complete MIP problem as submitted by a caller. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MipProblem {
    pub parameters: Parameters,
    pub objective: Objective,
    pub variables: Vec<Variable>,
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub sos1: Vec<SosGroup>,
    #[serde(default)]
    pub sos2: Vec<SosGroup>,
    #[serde(default)]
    pub solver_options: Option<IndexMap<String, serde_json::Value>>,
}

impl MipProblem {
    pub fn new(name: impl Into<String>, sense: ObjectiveSense) -> Self {
        Self {
            parameters: Parameters {
                name: name.into(),
                sense: sense.as_wire(),
                status: 0,
                sol_status: 0,
            },
            objective: Objective {
                name: Some("objective".to_string()),
                coefficients: Vec::new(),
            },
            variables: Vec::new(),
            constraints: Vec::new(),
            sos1: Vec::new(),
            sos2: Vec::new(),
            solver_options: None,
        }
    }

    pub fn minimize(name: impl Into<String>) -> Self {
        Self::new(name, ObjectiveSense::Minimize)
    }

    pub fn maximize(name: impl Into<String>) -> Self {
        Self::new(name, ObjectiveSense::Maximize)
    }

    pub fn add_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn add_objective_term(mut self, name: impl Into<String>, value: f64) -> Self {
        self.objective.coefficients.push(Coefficient::new(name, value));
        self
    }

    pub fn add_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn name(&self) -> &str {
        &self.parameters.name
    }

    pub fn objective_sense(&self) -> ObjectiveSense {
        ObjectiveSense::from_wire(self.parameters.sense)
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_integer_variables(&self) -> usize {
        self.variables.iter().filter(|v| v.category.is_integer()).count()
    }

    pub fn is_mixed_integer(&self) -> bool {
        self.num_integer_variables() > 0
    }

    /// Checks that every coefficient references a declared variable.
    ///
    /// This is a caller error, not a solve failure: it is rejected before any
    /// event stream is started.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.objective.coefficients.is_empty() {
            return Err(SchemaError::EmptyObjective);
        }

        let declared: HashSet<&str> = self.variables.iter().map(|v| v.name.as_str()).collect();
        let check = |context: String, name: &str| -> Result<(), SchemaError> {
            if declared.contains(name) {
                Ok(())
            } else {
                Err(SchemaError::UndeclaredVariable {
                    context,
                    name: name.to_string(),
                })
            }
        };

        for coeff in &self.objective.coefficients {
            check("objective".to_string(), &coeff.name)?;
        }
        for (i, constraint) in self.constraints.iter().enumerate() {
            for coeff in &constraint.coefficients {
                check(format!("constraint '{}'", constraint.label(i)), &coeff.name)?;
            }
        }
        for (i, group) in self.sos1.iter().enumerate() {
            for name in group.keys() {
                check(format!("sos1 group {i}"), name)?;
            }
        }
        for (i, group) in self.sos2.iter().enumerate() {
            for name in group.keys() {
                check(format!("sos2 group {i}"), name)?;
            }
        }
        Ok(())
    }
}

/// One constraint the relaxation leaves violated, reported when infeasible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolatedConstraint {
    pub name: String,
    pub violation_amount: f64,
    pub left_hand_side: f64,
    pub right_hand_side: f64,
    /// Engine one-letter sense: "L", "G" or "E".
    pub sense: String,
}

/// Infeasibility certificate attached to an infeasible solution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(default)]
    pub violated_constraints: Vec<ViolatedConstraint>,
    #[serde(default)]
    pub irreducible_infeasible_set: Vec<String>,
    #[serde(default)]
    pub dual_values: IndexMap<String, f64>,
}

/// Terminal result of one solve, produced exactly once and owned by the
/// caller after receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MipSolution {
    pub name: String,
    /// Raw engine status string; consumers map it through the fixed table.
    pub status: String,
    pub objective_value: Option<f64>,
    pub variables: IndexMap<String, f64>,
    #[serde(default)]
    pub diagnostics: Option<Diagnostics>,
}

impl MipSolution {
    pub fn not_solved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "not solved".to_string(),
            objective_value: None,
            variables: IndexMap::new(),
            diagnostics: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_wire_problem() -> serde_json::Value {
        serde_json::json!({
            "parameters": {"name": "test_problem", "sense": 1, "status": 0, "sol_status": 0},
            "objective": {
                "name": "objective",
                "coefficients": [{"name": "x", "value": 1.0}]
            },
            "constraints": [
                {"name": "c1", "sense": 1,
                 "coefficients": [{"name": "x", "value": 1.0}], "constant": -1.0}
            ],
            "variables": [
                {"name": "x", "lowBound": 0, "upBound": null, "cat": "Continuous"}
            ]
        })
    }

    #[test]
    fn decodes_legacy_wire_format() {
        let problem: MipProblem = serde_json::from_value(sample_wire_problem()).unwrap();
        assert_eq!(problem.name(), "test_problem");
        assert_eq!(problem.objective_sense(), ObjectiveSense::Minimize);
        assert_eq!(problem.variables[0].category, VariableCategory::Continuous);
        assert_eq!(problem.variables[0].lower_bound, Some(0.0));
        assert_eq!(problem.variables[0].upper_bound, None);
        assert_eq!(problem.constraints[0].sense, ConstraintSense::GreaterOrEqual);
        assert_eq!(problem.constraints[0].rhs(), 1.0);
        assert!(problem.sos1.is_empty());
        problem.validate().unwrap();
    }

    #[test]
    fn decodes_long_field_aliases() {
        let variable: Variable = serde_json::from_value(serde_json::json!({
            "name": "y", "category": "Binary", "lower_bound": 0.0, "upper_bound": 1.0
        }))
        .unwrap();
        assert_eq!(variable.category, VariableCategory::Binary);
        assert_eq!(variable.upper_bound, Some(1.0));
    }

    #[test]
    fn encodes_short_field_names() {
        let encoded = serde_json::to_value(Variable::binary("x")).unwrap();
        assert!(encoded.get("cat").is_some());
        assert!(encoded.get("lowBound").is_some());
        assert!(encoded.get("varValue").is_some());
        assert!(encoded.get("category").is_none());
    }

    #[test]
    fn dangling_coefficient_is_a_schema_error() {
        let problem = MipProblem::minimize("p")
            .add_variable(Variable::continuous("x"))
            .add_objective_term("x", 1.0)
            .add_constraint(Constraint::new(
                ConstraintSense::LessOrEqual,
                vec![Coefficient::new("ghost", 1.0)],
            ));
        let err = problem.validate().unwrap_err();
        assert!(matches!(err, SchemaError::UndeclaredVariable { .. }));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn constraint_rhs_negates_constant() {
        // x >= 1 arrives as coefficients {x: 1} with constant -1.
        let constraint = Constraint::new(
            ConstraintSense::GreaterOrEqual,
            vec![Coefficient::new("x", 1.0)],
        )
        .with_rhs(1.0);
        assert_eq!(constraint.constant, Some(-1.0));
        assert_eq!(constraint.rhs(), 1.0);
        let bare = Constraint::new(ConstraintSense::Equal, vec![]);
        assert_eq!(bare.rhs(), 0.0);
    }

    #[test]
    fn sos_groups_preserve_order() {
        // Deserialized straight from text so the document order of the group
        // is observable.
        let raw = r#"{
            "parameters": {"name": "p", "sense": 1, "status": 0, "sol_status": 0},
            "objective": {"coefficients": [{"name": "a", "value": 1.0}]},
            "constraints": [],
            "variables": [
                {"name": "a", "cat": "Continuous"},
                {"name": "b", "cat": "Continuous"}
            ],
            "sos1": [{"b": 1.0, "a": 2.0}]
        }"#;
        let problem: MipProblem = serde_json::from_str(raw).unwrap();
        let keys: Vec<&str> = problem.sos1[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn solution_round_trips() {
        let solution = MipSolution {
            name: "p".to_string(),
            status: "optimal".to_string(),
            objective_value: Some(1.0),
            variables: IndexMap::from([("x".to_string(), 1.0)]),
            diagnostics: None,
        };
        let json = serde_json::to_string(&solution).unwrap();
        let back: MipSolution = serde_json::from_str(&json).unwrap();
        assert_eq!(back, solution);
    }
}
