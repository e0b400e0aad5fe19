//! Trajectory target generation.
//!
//! Path input is an explicit discriminated choice; nothing is inferred
//! from array shape. Every variant is validated against the active
//! engine's pseudo-axis count before any solve runs.

use crate::domain::{DiffcalcError, DiffcalcResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathSpec {
    /// One target vector.
    Single(Vec<f64>),
    /// `n + 1` evenly spaced targets from `start` to `end`, both inclusive.
    Interpolated {
        start: Vec<f64>,
        end: Vec<f64>,
        n: usize,
    },
    /// An explicit ordered list of target vectors, solved in the given
    /// order.
    Explicit(Vec<Vec<f64>>),
}

impl PathSpec {
    /// Expand into the ordered target list, checking every vector against
    /// the pseudo-axis count.
    pub fn expand(&self, axis_count: usize) -> DiffcalcResult<Vec<Vec<f64>>> {
        let check = |vector: &Vec<f64>| -> DiffcalcResult<()> {
            if vector.len() != axis_count {
                return Err(DiffcalcError::invalid_shape(format!(
                    "expected {axis_count} pseudo-axis values, got {}",
                    vector.len()
                )));
            }
            Ok(())
        };

        match self {
            Self::Single(target) => {
                check(target)?;
                Ok(vec![target.clone()])
            }
            Self::Interpolated { start, end, n } => {
                check(start)?;
                check(end)?;
                linear_path(start, end, *n)
            }
            Self::Explicit(targets) => {
                for target in targets {
                    check(target)?;
                }
                Ok(targets.clone())
            }
        }
    }
}

/// `n + 1` linearly interpolated vectors from `start` to `end` inclusive.
/// `n = 0` degenerates to the start point alone.
pub fn linear_path(start: &[f64], end: &[f64], n: usize) -> DiffcalcResult<Vec<Vec<f64>>> {
    if start.len() != end.len() {
        return Err(DiffcalcError::invalid_shape(format!(
            "start has {} components but end has {}",
            start.len(),
            end.len()
        )));
    }
    if n == 0 {
        return Ok(vec![start.to_vec()]);
    }

    let steps = n as f64;
    Ok((0..=n)
        .map(|i| {
            if i == n {
                return end.to_vec();
            }
            let t = i as f64 / steps;
            // s + (e - s) * t keeps held components (s == e) bit-exact
            start
                .iter()
                .zip(end.iter())
                .map(|(s, e)| s + (e - s) * t)
                .collect()
        })
        .collect())
}
