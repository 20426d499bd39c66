// Domain value objects for the MIP wire schema

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Category of a decision variable.
///
/// Wire form is a case-sensitive string. Unrecognized categories decode as
/// `Integer` rather than failing the whole problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariableCategory {
    /// Continuous real number (x ∈ ℝ)
    Continuous,
    /// Integer number (x ∈ ℤ)
    #[default]
    Integer,
    /// Binary variable (x ∈ {0, 1})
    Binary,
}

impl VariableCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableCategory::Continuous => "Continuous",
            VariableCategory::Integer => "Integer",
            VariableCategory::Binary => "Binary",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, VariableCategory::Integer | VariableCategory::Binary)
    }
}

impl Serialize for VariableCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for VariableCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "Continuous" => VariableCategory::Continuous,
            "Binary" => VariableCategory::Binary,
            // Fail-safe: an unknown category is treated as integer-typed.
            _ => VariableCategory::Integer,
        })
    }
}

/// Comparison direction of a linear constraint.
///
/// The integer encoding (EQ=0, LEQ=-1, GEQ=1) is fixed for byte-compatibility
/// with existing deployments and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    Equal,
    LessOrEqual,
    GreaterOrEqual,
}

impl ConstraintSense {
    pub fn as_wire(&self) -> i8 {
        match self {
            ConstraintSense::Equal => 0,
            ConstraintSense::LessOrEqual => -1,
            ConstraintSense::GreaterOrEqual => 1,
        }
    }

    /// One-letter form used in infeasibility diagnostics ("E", "L", "G").
    pub fn letter(&self) -> &'static str {
        match self {
            ConstraintSense::Equal => "E",
            ConstraintSense::LessOrEqual => "L",
            ConstraintSense::GreaterOrEqual => "G",
        }
    }
}

impl Serialize for ConstraintSense {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ConstraintSense {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match i64::deserialize(deserializer)? {
            0 => Ok(ConstraintSense::Equal),
            -1 => Ok(ConstraintSense::LessOrEqual),
            1 => Ok(ConstraintSense::GreaterOrEqual),
            other => Err(serde::de::Error::custom(format!(
                "invalid constraint sense {other}, expected 0, -1 or 1"
            ))),
        }
    }
}

impl fmt::Display for ConstraintSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintSense::Equal => write!(f, "="),
            ConstraintSense::LessOrEqual => write!(f, "<="),
            ConstraintSense::GreaterOrEqual => write!(f, ">="),
        }
    }
}

/// Direction of optimization. Wire form lives in `Parameters::sense`
/// (1 = minimize, -1 = maximize).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    Minimize,
    Maximize,
}

impl ObjectiveSense {
    pub fn from_wire(sense: i32) -> Self {
        if sense == 1 {
            ObjectiveSense::Minimize
        } else {
            ObjectiveSense::Maximize
        }
    }

    pub fn as_wire(&self) -> i32 {
        match self {
            ObjectiveSense::Minimize => 1,
            ObjectiveSense::Maximize => -1,
        }
    }
}

impl fmt::Display for ObjectiveSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectiveSense::Minimize => write!(f, "minimize"),
            ObjectiveSense::Maximize => write!(f, "maximize"),
        }
    }
}

/// Unified terminal status exposed to callers.
///
/// Engine status strings go through [`SolveStatus::from_engine_status`], a
/// fixed table. "timelimit" and "not solved" intentionally collapse to
/// `NotSolved`; anything unrecognized falls back to `Undefined`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    NotSolved,
    Undefined,
}

impl SolveStatus {
    pub fn from_engine_status(status: &str) -> Self {
        match status {
            "optimal" => SolveStatus::Optimal,
            "infeasible" => SolveStatus::Infeasible,
            "unbounded" => SolveStatus::Unbounded,
            "not solved" | "timelimit" => SolveStatus::NotSolved,
            _ => SolveStatus::Undefined,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::NotSolved => "not solved",
            SolveStatus::Undefined => "undefined",
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
