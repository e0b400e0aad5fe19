//! Geometry solver boundary.
//!
//! [`GeometrySolver`] is the oracle contract: given the active mode, the
//! detector, the sample orientation state and a target pseudo-axis vector,
//! a backend returns an ordered list of candidate physical-axis geometries.
//! The ordering is the backend's own ranking and is never re-sorted by the
//! layers above. Backend-internal failures surface as the single
//! `CalculationFailed` error kind.
//!
//! Frame convention for the built-in backends: x along the incident beam,
//! z vertical, `|k| = 1/wavelength`, so `|q| = 2 sin(theta) / wavelength`
//! matches a B matrix with no 2-pi factor.

pub mod eulerian;
pub mod twoc;

use crate::domain::{
    Detector, DiffcalcError, DiffcalcResult, EngineMeta, GeometryMeta, GeometryType,
};
use crate::support::math::{mat_transpose, mat_vec, Mat3, Vec3};
use serde::{Deserialize, Serialize};

/// Full physical-axis state at one instant: axis values in canonical
/// radians, in the geometry's registered axis order, plus the wavelength
/// (angstroms) in effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometrySnapshot {
    pub geometry: GeometryType,
    pub axis_names: Vec<String>,
    pub axis_values: Vec<f64>,
    pub wavelength: f64,
}

impl GeometrySnapshot {
    pub fn axis_value(&self, name: &str) -> Option<f64> {
        self.axis_names
            .iter()
            .position(|axis| axis == name)
            .map(|index| self.axis_values[index])
    }

    fn require(&self, name: &str) -> DiffcalcResult<f64> {
        self.axis_value(name)
            .ok_or_else(|| DiffcalcError::calculation_failed(format!("axis '{name}' missing from geometry state")))
    }
}

/// One candidate physical-axis configuration, axis values in canonical
/// radians in the geometry's axis order.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryCandidate {
    pub axis_values: Vec<f64>,
}

/// Everything a backend may consult for one solve.
pub struct SolverContext<'a> {
    pub meta: &'static GeometryMeta,
    pub engine: &'static EngineMeta,
    pub mode: &'static str,
    pub detector: &'a Detector,
    pub ub: Mat3,
    pub current: &'a GeometrySnapshot,
    /// Canonical `(low, high)` per physical axis, in axis order. Candidates
    /// violating a limit are dropped by the backend.
    pub limits: &'a [(f64, f64)],
}

pub trait GeometrySolver: Sync {
    /// Inverse solve: pseudo-axis target to candidate geometries. An empty
    /// result is reported as a calculation failure, never an empty list.
    fn solve(
        &self,
        ctx: &SolverContext<'_>,
        target: &[f64],
    ) -> DiffcalcResult<Vec<GeometryCandidate>>;

    /// Forward solve: pseudo-axis values implied by the current geometry.
    fn forward(&self, ctx: &SolverContext<'_>) -> DiffcalcResult<Vec<f64>>;
}

static EULERIAN_HKL: eulerian::EulerianHklSolver = eulerian::EulerianHklSolver;
static Q_BACKEND: twoc::QEngineSolver = twoc::QEngineSolver;

/// Map a geometry tag and engine name to the registered backend.
pub fn solver_for(
    geometry: GeometryType,
    engine: &str,
) -> DiffcalcResult<&'static dyn GeometrySolver> {
    match (geometry, engine) {
        (GeometryType::E4ch | GeometryType::E4cv | GeometryType::E6c, "hkl") => Ok(&EULERIAN_HKL),
        (_, "q") => Ok(&Q_BACKEND),
        _ => Err(DiffcalcError::UnknownEngine {
            requested: engine.to_string(),
            geometry: geometry.to_string(),
            available: crate::domain::geometry_meta(geometry)
                .engines
                .iter()
                .map(|meta| meta.name)
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// Rotation carrying the sample holder (phi frame) into the lab frame.
pub fn sample_rotation(snapshot: &GeometrySnapshot) -> DiffcalcResult<Mat3> {
    match snapshot.geometry {
        GeometryType::E4ch | GeometryType::E4cv => {
            eulerian::four_circle_sample_rotation(snapshot)
        }
        GeometryType::E6c => eulerian::six_circle_sample_rotation(snapshot),
        GeometryType::TwoC => twoc::two_circle_sample_rotation(snapshot),
    }
}

/// Diffraction vector `k_f - k_i` in the lab frame, reciprocal angstroms.
pub fn scattering_vector_lab(snapshot: &GeometrySnapshot) -> DiffcalcResult<Vec3> {
    let k = 1.0 / snapshot.wavelength;
    let k_out = match snapshot.geometry {
        GeometryType::E4ch | GeometryType::E4cv | GeometryType::TwoC => {
            let tth = snapshot.require("tth")?;
            [k * tth.cos(), k * tth.sin(), 0.0]
        }
        GeometryType::E6c => {
            let gamma = snapshot.require("gamma")?;
            let delta = snapshot.require("delta")?;
            let along_beam = [k, 0.0, 0.0];
            let rotated = mat_vec(&crate::support::math::rotation_z(delta), along_beam);
            mat_vec(&crate::support::math::rotation_x(gamma), rotated)
        }
    };
    Ok([k_out[0] - k, k_out[1], k_out[2]])
}

/// Diffraction vector expressed in the sample holder (phi) frame; the
/// measured counterpart of `UB * hkl`.
pub fn scattering_vector_sample(snapshot: &GeometrySnapshot) -> DiffcalcResult<Vec3> {
    let rotation = sample_rotation(snapshot)?;
    let q_lab = scattering_vector_lab(snapshot)?;
    Ok(mat_vec(&mat_transpose(&rotation), q_lab))
}

/// Wrap an angle into (-pi, pi].
pub fn normalize_angle(angle: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let mut wrapped = angle % tau;
    if wrapped <= -std::f64::consts::PI {
        wrapped += tau;
    } else if wrapped > std::f64::consts::PI {
        wrapped -= tau;
    }
    wrapped
}

pub(crate) fn within_limits(candidate: &GeometryCandidate, limits: &[(f64, f64)]) -> bool {
    candidate
        .axis_values
        .iter()
        .zip(limits.iter())
        .all(|(value, (low, high))| value >= low && value <= high)
}

/// Drop candidates outside the configured axis limits; an empty survivor
/// set is a calculation failure.
pub(crate) fn filter_by_limits(
    candidates: Vec<GeometryCandidate>,
    limits: &[(f64, f64)],
) -> DiffcalcResult<Vec<GeometryCandidate>> {
    let total = candidates.len();
    let survivors: Vec<GeometryCandidate> = candidates
        .into_iter()
        .filter(|candidate| within_limits(candidate, limits))
        .collect();
    tracing::trace!(total, kept = survivors.len(), "filtered candidates by axis limits");
    if survivors.is_empty() {
        return Err(DiffcalcError::calculation_failed(
            "no candidate geometry within the configured axis limits",
        ));
    }
    Ok(survivors)
}
