//! Crystal sample: lattice, orientation matrices and recorded reflections.

use crate::domain::{Detector, DiffcalcError, DiffcalcResult, UnitSystem};
use crate::lattice::Lattice;
use crate::parameter::Parameter;
use crate::solver::{scattering_vector_sample, GeometrySnapshot};
use crate::support::math::{
    angle_between, euler_from_matrix, mat_mul, mat_vec, matrix_from_euler,
    orthonormality_deviation, Mat3,
};
use serde::{Deserialize, Serialize};

const ORTHONORMALITY_TOLERANCE: f64 = 1.0e-6;

/// Opaque identity of a recorded reflection. Handles are never reused
/// within a sample and survive removal of other reflections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReflectionId(u64);

impl ReflectionId {
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// A recorded correspondence between an (h, k, l) and the physical-axis
/// geometry at which it was measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    id: ReflectionId,
    hkl: [f64; 3],
    geometry: GeometrySnapshot,
    detector: Detector,
}

impl Reflection {
    pub const fn id(&self) -> ReflectionId {
        self.id
    }

    pub const fn hkl(&self) -> [f64; 3] {
        self.hkl
    }

    pub fn geometry(&self) -> &GeometrySnapshot {
        &self.geometry
    }

    pub const fn detector(&self) -> Detector {
        self.detector
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    name: String,
    lattice: Lattice,
    u: Mat3,
    /// Explicit UB override; `None` means UB is derived as `U * B`.
    ub_override: Option<Mat3>,
    ux: Parameter,
    uy: Parameter,
    uz: Parameter,
    reflections: Vec<Reflection>,
    next_reflection: u64,
    units: UnitSystem,
}

impl Sample {
    /// A sample with the default 1.54 angstrom cubic cell and identity
    /// orientation.
    pub fn new(name: impl Into<String>, units: UnitSystem) -> Self {
        Self::with_lattice(name, Lattice::default_cell(), units)
    }

    pub fn with_lattice(name: impl Into<String>, lattice: Lattice, units: UnitSystem) -> Self {
        Self {
            name: name.into(),
            lattice,
            u: crate::support::math::IDENTITY,
            ub_override: None,
            ux: Parameter::rotation("ux", units),
            uy: Parameter::rotation("uy", units),
            uz: Parameter::rotation("uz", units),
            reflections: Vec::new(),
            next_reflection: 0,
            units,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renaming is owned by the session registry so the name-to-sample map
    /// stays keyed correctly.
    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Replace the lattice. B and UB are derived lazily on read; an
    /// explicit UB override is discarded since it no longer matches.
    pub fn set_lattice(&mut self, lattice: Lattice) {
        self.lattice = lattice;
        self.ub_override = None;
    }

    /// The reciprocal lattice, computed fresh on every call.
    pub fn reciprocal(&self) -> Lattice {
        self.lattice.reciprocal()
    }

    /// The orientation matrix U.
    pub fn u(&self) -> Mat3 {
        self.u
    }

    /// Set U from a plain 3x3 array. The matrix must be approximately
    /// orthonormal; the ux/uy/uz parameters are re-derived from it and an
    /// explicit UB override is discarded.
    pub fn set_u(&mut self, u: Mat3) -> DiffcalcResult<()> {
        let deviation = orthonormality_deviation(&u);
        if deviation > ORTHONORMALITY_TOLERANCE {
            return Err(DiffcalcError::InvalidOrientation { deviation });
        }
        let (ex, ey, ez) = euler_from_matrix(&u);
        // stage the parameter writes so a limit violation leaves the
        // sample untouched
        let mut ux = self.ux.clone();
        let mut uy = self.uy.clone();
        let mut uz = self.uz.clone();
        ux.set_value_in(UnitSystem::Default, ex)?;
        uy.set_value_in(UnitSystem::Default, ey)?;
        uz.set_value_in(UnitSystem::Default, ez)?;
        self.u = u;
        self.ub_override = None;
        self.ux = ux;
        self.uy = uy;
        self.uz = uz;
        Ok(())
    }

    /// The UB matrix: the explicit override if one was set, otherwise
    /// `U * B` derived from the current lattice.
    pub fn ub(&self) -> Mat3 {
        match self.ub_override {
            Some(ub) => ub,
            None => mat_mul(&self.u, &self.lattice.b_matrix()),
        }
    }

    /// Store an explicit UB matrix. Nothing else is recomputed: keeping U
    /// and UB mutually consistent after independent writes is the caller's
    /// responsibility.
    pub fn set_ub(&mut self, ub: Mat3) {
        self.ub_override = Some(ub);
    }

    pub fn ux(&self) -> &Parameter {
        &self.ux
    }

    pub fn uy(&self) -> &Parameter {
        &self.uy
    }

    pub fn uz(&self) -> &Parameter {
        &self.uz
    }

    /// Adjust one orientation angle (interpreted in the parameter's active
    /// unit system) and rebuild U from the three of them.
    pub fn set_ux(&mut self, value: f64) -> DiffcalcResult<()> {
        self.ux.set_value(value)?;
        self.rebuild_u_from_angles();
        Ok(())
    }

    pub fn set_uy(&mut self, value: f64) -> DiffcalcResult<()> {
        self.uy.set_value(value)?;
        self.rebuild_u_from_angles();
        Ok(())
    }

    pub fn set_uz(&mut self, value: f64) -> DiffcalcResult<()> {
        self.uz.set_value(value)?;
        self.rebuild_u_from_angles();
        Ok(())
    }

    fn rebuild_u_from_angles(&mut self) {
        self.u = matrix_from_euler(
            self.ux.value_in(UnitSystem::Default),
            self.uy.value_in(UnitSystem::Default),
            self.uz.value_in(UnitSystem::Default),
        );
        self.ub_override = None;
    }

    pub fn reflections(&self) -> &[Reflection] {
        &self.reflections
    }

    /// Record a reflection against the given geometry snapshot and
    /// detector. Returns the reflection's opaque handle.
    pub fn add_reflection(
        &mut self,
        h: f64,
        k: f64,
        l: f64,
        geometry: GeometrySnapshot,
        detector: Detector,
    ) -> ReflectionId {
        let id = ReflectionId(self.next_reflection);
        self.next_reflection += 1;
        self.reflections.push(Reflection {
            id,
            hkl: [h, k, l],
            geometry,
            detector,
        });
        id
    }

    /// Remove a reflection by handle. Surviving handles are unaffected.
    pub fn remove_reflection(&mut self, id: ReflectionId) -> DiffcalcResult<Reflection> {
        let index = self
            .reflections
            .iter()
            .position(|reflection| reflection.id == id)
            .ok_or(DiffcalcError::UnknownReflection { id: id.0 })?;
        Ok(self.reflections.remove(index))
    }

    /// Remove the first reflection whose stored (h, k, l) matches exactly.
    pub fn remove_reflection_hkl(&mut self, h: f64, k: f64, l: f64) -> DiffcalcResult<Reflection> {
        let index = self
            .reflections
            .iter()
            .position(|reflection| reflection.hkl == [h, k, l])
            .ok_or(DiffcalcError::ReflectionNotFound { h, k, l })?;
        Ok(self.reflections.remove(index))
    }

    /// Remove all reflections. No-op when already empty.
    pub fn clear_reflections(&mut self) {
        self.reflections.clear();
    }

    fn angle_matrix<F>(&self, angle: F) -> DiffcalcResult<Vec<Vec<f64>>>
    where
        F: Fn(&Reflection, &Reflection) -> DiffcalcResult<f64>,
    {
        let count = self.reflections.len();
        let mut matrix = vec![vec![0.0; count]; count];
        for (i, first) in self.reflections.iter().enumerate() {
            for (j, second) in self.reflections.iter().enumerate() {
                if i != j {
                    matrix[i][j] = angle(first, second)?;
                }
            }
        }
        Ok(matrix)
    }

    /// N x N matrix of angles between reflections as actually measured,
    /// reconstructed from each reflection's recorded geometry. Radians;
    /// diagonal is exactly zero. Regenerated fresh on every call.
    pub fn reflection_measured_angles(&self) -> DiffcalcResult<Vec<Vec<f64>>> {
        self.angle_matrix(|first, second| {
            let q_first = scattering_vector_sample(&first.geometry)?;
            let q_second = scattering_vector_sample(&second.geometry)?;
            Ok(angle_between(q_first, q_second))
        })
    }

    /// N x N matrix of angles between reflections as predicted by the
    /// current lattice alone. Radians; diagonal is exactly zero.
    pub fn reflection_theoretical_angles(&self) -> DiffcalcResult<Vec<Vec<f64>>> {
        let b = self.lattice.b_matrix();
        self.angle_matrix(|first, second| {
            Ok(angle_between(
                mat_vec(&b, first.hkl()),
                mat_vec(&b, second.hkl()),
            ))
        })
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }
}
