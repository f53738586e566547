//! Score category definitions
//!
//! A category is an ordered list of factors, each with a value range, a signed
//! weight and a transform. Definitions are static configuration loaded from
//! TOML and validated once when the scoring engine is built.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Nonlinear transform applied to a factor value before weighting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Identity,
    Square,
    Power(f64),
}

impl Transform {
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Transform::Identity => x,
            Transform::Square => x * x,
            Transform::Power(exponent) => x.powf(*exponent),
        }
    }
}

/// One weighted input of a score category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactorSpec {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub weight: f64,
    pub transform: Transform,
}

impl FactorSpec {
    /// Weighted contribution of a value
    pub fn contribution(&self, value: f64) -> f64 {
        self.transform.apply(value) * self.weight
    }

    /// (lowest, highest) contribution over the factor's range, oriented by
    /// the sign of the weight
    pub fn contribution_bounds(&self) -> (f64, f64) {
        if self.weight > 0.0 {
            (self.contribution(self.min), self.contribution(self.max))
        } else {
            (self.contribution(self.max), self.contribution(self.min))
        }
    }
}

/// A named score category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreDefinition {
    pub name: String,
    /// Rescale the raw sum into [-100, 100]
    pub rescale: bool,
    pub factors: Vec<FactorSpec>,
}

impl ScoreDefinition {
    /// Theoretical (min, max) raw score
    pub fn raw_bounds(&self) -> (f64, f64) {
        let mut min_possible = 0.0;
        let mut max_possible = 0.0;
        for factor in &self.factors {
            let (low, high) = factor.contribution_bounds();
            min_possible += low;
            max_possible += high;
        }
        (min_possible, max_possible)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        let invalid = |msg: String| ComputeError::InvalidDefinition(format!("{}: {}", self.name, msg));

        if self.name.trim().is_empty() {
            return Err(ComputeError::InvalidDefinition(
                "category name is empty".to_string(),
            ));
        }
        if self.factors.is_empty() {
            return Err(invalid("no factors".to_string()));
        }

        let mut seen = HashSet::new();
        for factor in &self.factors {
            if !seen.insert(factor.name.as_str()) {
                return Err(invalid(format!("duplicate factor '{}'", factor.name)));
            }
            if !factor.weight.is_finite() || factor.weight == 0.0 {
                return Err(invalid(format!(
                    "factor '{}' has weight {}",
                    factor.name, factor.weight
                )));
            }
            if !(factor.min.is_finite() && factor.max.is_finite() && factor.min < factor.max) {
                return Err(invalid(format!(
                    "factor '{}' has range {} .. {}",
                    factor.name, factor.min, factor.max
                )));
            }
            let (low, high) = factor.contribution_bounds();
            if !(low.is_finite() && high.is_finite()) {
                return Err(invalid(format!(
                    "factor '{}' transform is not finite over its range",
                    factor.name
                )));
            }
        }

        if self.rescale {
            let (min_possible, max_possible) = self.raw_bounds();
            if !(max_possible - min_possible > 0.0) {
                return Err(invalid(format!(
                    "degenerate rescale range {} .. {}",
                    min_possible, max_possible
                )));
            }
        }

        Ok(())
    }
}

/// Manual mood override: a note containing `pattern` sets `elevated` to `score`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExceptionalDay {
    pub pattern: String,
    pub score: f64,
}
