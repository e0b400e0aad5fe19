//! Two-circle reduction: the `q` engine backend.
//!
//! `q` is the scattering-vector length in reciprocal angstroms. The solve
//! places the detector circle at the Bragg angle and bisects with omega;
//! every other circle is held at its current value (the six-circle variant
//! zeroes its out-of-plane circles `mu` and `gamma`).

use super::{
    filter_by_limits, scattering_vector_lab, GeometryCandidate, GeometrySnapshot, GeometrySolver,
    SolverContext,
};
use crate::domain::{DiffcalcError, DiffcalcResult, GeometryMeta, GeometryType};
use crate::support::math::{norm, rotation_z, Mat3};

pub fn two_circle_sample_rotation(snapshot: &GeometrySnapshot) -> DiffcalcResult<Mat3> {
    let omega = snapshot.require("omega")?;
    Ok(rotation_z(omega))
}

fn set_axis(meta: &'static GeometryMeta, values: &mut [f64], name: &str, value: f64) {
    if let Some(index) = meta.physical_axes.iter().position(|axis| *axis == name) {
        values[index] = value;
    }
}

pub struct QEngineSolver;

impl GeometrySolver for QEngineSolver {
    fn solve(
        &self,
        ctx: &SolverContext<'_>,
        target: &[f64],
    ) -> DiffcalcResult<Vec<GeometryCandidate>> {
        let [q] = target else {
            return Err(DiffcalcError::invalid_shape(format!(
                "q engine expects 1 pseudo-axis value, got {}",
                target.len()
            )));
        };
        if *q < 0.0 {
            return Err(DiffcalcError::calculation_failed(format!(
                "q must be non-negative, got {q}"
            )));
        }

        let sin_theta = q * ctx.current.wavelength / 2.0;
        if sin_theta > 1.0 {
            return Err(DiffcalcError::calculation_failed(format!(
                "q = {q} is unreachable at wavelength {}",
                ctx.current.wavelength
            )));
        }
        let theta = sin_theta.asin();

        let mut axis_values = ctx.current.axis_values.clone();
        set_axis(ctx.meta, &mut axis_values, "omega", theta);
        match ctx.meta.geometry {
            GeometryType::E6c => {
                set_axis(ctx.meta, &mut axis_values, "mu", 0.0);
                set_axis(ctx.meta, &mut axis_values, "gamma", 0.0);
                set_axis(ctx.meta, &mut axis_values, "delta", 2.0 * theta);
            }
            _ => set_axis(ctx.meta, &mut axis_values, "tth", 2.0 * theta),
        }
        tracing::trace!(q, theta, "q engine candidate computed");

        filter_by_limits(vec![GeometryCandidate { axis_values }], ctx.limits)
    }

    fn forward(&self, ctx: &SolverContext<'_>) -> DiffcalcResult<Vec<f64>> {
        let q_lab = scattering_vector_lab(ctx.current)?;
        Ok(vec![norm(q_lab)])
    }
}
