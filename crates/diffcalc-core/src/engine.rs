//! Calculation engine state and solve products.
//!
//! An engine is *unsolved* until a forward solve stores a non-empty
//! solution set; it returns to *unsolved* when a solution is selected or a
//! new solve supersedes the set. Solutions are deep snapshots: they stay
//! valid after the engine has moved on.

use crate::domain::{DiffcalcError, DiffcalcResult, EngineMeta, UnitSystem};
use crate::solver::GeometryCandidate;
use serde::{Deserialize, Serialize};

/// Opaque handle of one solution within one solve. The generation ties the
/// handle to the solve that produced it, so a handle from a superseded
/// solve can never select silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolutionId {
    generation: u64,
    index: usize,
}

impl SolutionId {
    pub const fn generation(self) -> u64 {
        self.generation
    }

    pub const fn index(self) -> usize {
        self.index
    }
}

/// One candidate physical-axis configuration produced by a forward solve,
/// frozen at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    id: SolutionId,
    axis_names: Vec<String>,
    // canonical radians
    axis_values: Vec<f64>,
    pseudo_axis_names: Vec<String>,
    pseudo_target: Vec<f64>,
    wavelength: f64,
    units: UnitSystem,
}

impl Solution {
    pub const fn id(&self) -> SolutionId {
        self.id
    }

    pub fn axis_names(&self) -> &[String] {
        &self.axis_names
    }

    /// Axis values in the solution's unit system.
    pub fn axis_values(&self) -> Vec<f64> {
        self.axis_values
            .iter()
            .map(|value| self.units.angle_from_default(*value))
            .collect()
    }

    /// Axis values in canonical radians.
    pub fn axis_values_default(&self) -> &[f64] {
        &self.axis_values
    }

    /// One axis value by name, in the solution's unit system.
    pub fn axis_value(&self, name: &str) -> Option<f64> {
        self.axis_names
            .iter()
            .position(|axis| axis == name)
            .map(|index| self.units.angle_from_default(self.axis_values[index]))
    }

    pub fn pseudo_axis_names(&self) -> &[String] {
        &self.pseudo_axis_names
    }

    /// The pseudo-axis target that produced this solution.
    pub fn pseudo_target(&self) -> &[f64] {
        &self.pseudo_target
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    meta: &'static EngineMeta,
    mode: &'static str,
    pseudo_values: Vec<f64>,
    solutions: Vec<Solution>,
    generation: u64,
    units: UnitSystem,
}

impl Engine {
    pub(crate) fn new(meta: &'static EngineMeta, units: UnitSystem) -> Self {
        Self {
            meta,
            mode: meta.modes[0],
            pseudo_values: vec![0.0; meta.pseudo_axes.len()],
            solutions: Vec::new(),
            generation: 0,
            units,
        }
    }

    pub fn name(&self) -> &'static str {
        self.meta.name
    }

    pub fn modes(&self) -> &'static [&'static str] {
        self.meta.modes
    }

    pub fn mode(&self) -> &'static str {
        self.mode
    }

    /// Switch the constraint mode for subsequent solves. Has no effect on
    /// an already-computed solution set.
    pub fn set_mode(&mut self, mode: &str) -> DiffcalcResult<()> {
        let registered = self
            .meta
            .modes
            .iter()
            .find(|candidate| **candidate == mode)
            .ok_or_else(|| DiffcalcError::UnknownMode {
                requested: mode.to_string(),
                engine: self.meta.name.to_string(),
                available: self.meta.modes.join(", "),
            })?;
        self.mode = registered;
        Ok(())
    }

    pub fn pseudo_axis_names(&self) -> &'static [&'static str] {
        self.meta.pseudo_axes
    }

    /// Last known pseudo-axis values (target of the most recent solve, or
    /// the forward read-back after a re-initialization).
    pub fn pseudo_axis_values(&self) -> &[f64] {
        &self.pseudo_values
    }

    pub fn pseudo_value(&self, name: &str) -> DiffcalcResult<f64> {
        self.meta
            .pseudo_axes
            .iter()
            .position(|axis| *axis == name)
            .map(|index| self.pseudo_values[index])
            .ok_or_else(|| DiffcalcError::UnknownAxis {
                requested: name.to_string(),
            })
    }

    /// The pending solution set. Empty unless a solve just completed.
    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    pub(crate) fn meta(&self) -> &'static EngineMeta {
        self.meta
    }

    pub(crate) fn pending(&self, id: SolutionId) -> Option<&Solution> {
        (id.generation == self.generation)
            .then(|| self.solutions.get(id.index))
            .flatten()
    }

    pub(crate) fn clear_solutions(&mut self) {
        self.solutions.clear();
    }

    pub(crate) fn set_pseudo_values_readback(&mut self, values: Vec<f64>) {
        self.pseudo_values = values;
    }

    /// Freeze solver candidates into Solutions, superseding any pending
    /// set, and record the target as the new pseudo read-back.
    pub(crate) fn store_solutions(
        &mut self,
        target: &[f64],
        candidates: Vec<GeometryCandidate>,
        axis_names: &[&'static str],
        wavelength: f64,
    ) -> Vec<Solution> {
        self.generation += 1;
        self.solutions = candidates
            .into_iter()
            .enumerate()
            .map(|(index, candidate)| Solution {
                id: SolutionId {
                    generation: self.generation,
                    index,
                },
                axis_names: axis_names.iter().map(|name| name.to_string()).collect(),
                axis_values: candidate.axis_values,
                pseudo_axis_names: self
                    .meta
                    .pseudo_axes
                    .iter()
                    .map(|name| name.to_string())
                    .collect(),
                pseudo_target: target.to_vec(),
                wavelength,
                units: self.units,
            })
            .collect();
        self.pseudo_values = target.to_vec();
        tracing::debug!(
            engine = self.meta.name,
            solutions = self.solutions.len(),
            generation = self.generation,
            "stored solution set"
        );
        self.solutions.clone()
    }
}
