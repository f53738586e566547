//! Exercise classification
//!
//! The muscle groups of each exercise come from an external classifier as a
//! comma-separated list. Each group maps to a body aspect and a movement
//! pattern through a static reference table; an exercise takes the single
//! most common label, or `Unclear` when no label wins outright.

use crate::error::ComputeError;
use crate::ingest::RawTable;
use crate::types::ExerciseClassification;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Label used when no single label is most common
pub const UNCLEAR: &str = "Unclear";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyAspect {
    Anterior,
    Posterior,
}

impl BodyAspect {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyAspect::Anterior => "Anterior",
            BodyAspect::Posterior => "Posterior",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementPattern {
    Push,
    Pull,
    Legs,
}

impl MovementPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementPattern::Push => "Push",
            MovementPattern::Pull => "Pull",
            MovementPattern::Legs => "Legs",
        }
    }
}

/// Reference row for one muscle group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MuscleGroupRef {
    pub name: String,
    pub anterior_posterior: BodyAspect,
    pub push_pull_legs: MovementPattern,
}

/// Classifier output row
#[derive(Debug, Clone, PartialEq)]
pub struct MuscleGroupAssignment {
    pub exercise_name: String,
    pub muscle_groups: String,
}

/// Read classifier output (`exercise_name`, `muscle_groups`)
pub fn assignments_from_table(table: &RawTable) -> Result<Vec<MuscleGroupAssignment>, ComputeError> {
    let name_col = table.require_column("exercise_name")?;
    let groups_col = table.require_column("muscle_groups")?;

    Ok((0..table.len())
        .filter_map(|row| {
            let exercise_name = table.cell(row, name_col).trim();
            if exercise_name.is_empty() {
                return None;
            }
            Some(MuscleGroupAssignment {
                exercise_name: exercise_name.to_string(),
                muscle_groups: table.cell(row, groups_col).to_string(),
            })
        })
        .collect())
}

/// The unique most frequent label; `None` on a tie or with no labels
pub fn majority_or_unclear<T: Ord + Copy>(labels: &[T]) -> Option<T> {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(*label).or_default() += 1;
    }
    let top = counts.values().copied().max()?;
    let mut winners = counts.into_iter().filter(|(_, count)| *count == top);
    match (winners.next(), winners.next()) {
        (Some((label, _)), None) => Some(label),
        _ => None,
    }
}

/// Classify every exercise, ordered by exercise name
///
/// Muscle groups missing from the reference contribute no label.
pub fn classify(
    assignments: &[MuscleGroupAssignment],
    reference: &[MuscleGroupRef],
) -> Vec<ExerciseClassification> {
    let lookup: HashMap<String, &MuscleGroupRef> = reference
        .iter()
        .map(|r| (r.name.trim().to_lowercase(), r))
        .collect();

    // exercise → (groups in first-seen order, aspects, patterns)
    let mut grouped: BTreeMap<&str, (Vec<String>, Vec<BodyAspect>, Vec<MovementPattern>)> =
        BTreeMap::new();
    let mut unmatched = 0usize;

    for assignment in assignments {
        let slot = grouped.entry(assignment.exercise_name.as_str()).or_default();
        for group in assignment
            .muscle_groups
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
        {
            if !slot.0.iter().any(|g| g == group) {
                slot.0.push(group.to_string());
            }
            match lookup.get(&group.to_lowercase()) {
                Some(reference) => {
                    slot.1.push(reference.anterior_posterior);
                    slot.2.push(reference.push_pull_legs);
                }
                None => unmatched += 1,
            }
        }
    }
    if unmatched > 0 {
        debug!(groups = unmatched, "muscle groups without a reference entry");
    }

    grouped
        .into_iter()
        .map(|(name, (groups, aspects, patterns))| ExerciseClassification {
            exercise_name: name.to_string(),
            muscle_groups: groups.join(", "),
            anterior_posterior: majority_or_unclear(&aspects)
                .map_or(UNCLEAR, |a| a.as_str())
                .to_string(),
            push_pull_legs: majority_or_unclear(&patterns)
                .map_or(UNCLEAR, |p| p.as_str())
                .to_string(),
        })
        .collect()
}
