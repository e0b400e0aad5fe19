//! Busing-Levy backend for the Eulerian geometries (E4CH, E4CV, E6C).
//!
//! Sample rotation chains:
//!   four-circle: `Rz(omega) * Rx(chi) * Rz(phi)`
//!   six-circle:  `Rx(mu) * Rz(omega) * Rx(chi) * Rz(phi)`
//! The six-circle vertical modes hold `mu = gamma = 0` and reduce to the
//! four-circle construction with `delta` as the detector circle.

use super::{
    filter_by_limits, normalize_angle, scattering_vector_sample, GeometryCandidate,
    GeometrySnapshot, GeometrySolver, SolverContext,
};
use crate::domain::{DiffcalcError, DiffcalcResult, GeometryType};
use crate::support::math::{
    mat_inverse, mat_mul, mat_vec, norm, rotation_x, rotation_z, Mat3,
};
use std::f64::consts::FRAC_PI_2;

pub fn four_circle_sample_rotation(snapshot: &GeometrySnapshot) -> DiffcalcResult<Mat3> {
    let omega = snapshot.require("omega")?;
    let chi = snapshot.require("chi")?;
    let phi = snapshot.require("phi")?;
    Ok(mat_mul(
        &rotation_z(omega),
        &mat_mul(&rotation_x(chi), &rotation_z(phi)),
    ))
}

pub fn six_circle_sample_rotation(snapshot: &GeometrySnapshot) -> DiffcalcResult<Mat3> {
    let mu = snapshot.require("mu")?;
    let inner = four_circle_sample_rotation(snapshot)?;
    Ok(mat_mul(&rotation_x(mu), &inner))
}

/// Angles of one Busing-Levy branch for the reduced vertical four-circle
/// problem.
#[derive(Debug, Clone, Copy)]
struct Branch {
    omega: f64,
    chi: f64,
    phi: f64,
    tth: f64,
}

pub struct EulerianHklSolver;

impl EulerianHklSolver {
    /// Solve `Rz(omega) Rx(chi) Rz(phi) q_hat = q_lab_hat` with
    /// `q_lab_hat = (-sin(theta), cos(theta), 0)` rotated back by omega.
    fn branches(
        ctx: &SolverContext<'_>,
        unit_q: [f64; 3],
        theta: f64,
    ) -> DiffcalcResult<Vec<Branch>> {
        let [ux, uy, uz] = unit_q;
        let in_plane = (ux * ux + uy * uy).sqrt();
        let tth = 2.0 * theta;

        let constant_omega =
            matches!(ctx.mode, "constant_omega" | "constant_omega_vertical");
        if !constant_omega {
            // Bissector: omega = theta puts the target along +y of the
            // omega frame.
            let phi = ux.atan2(uy);
            let chi = (-uz).atan2(in_plane);
            let alternate_phi = normalize_angle(phi + std::f64::consts::PI);
            let alternate_chi = (-uz).atan2(-in_plane);
            return Ok(vec![
                Branch {
                    omega: theta,
                    chi,
                    phi,
                    tth,
                },
                Branch {
                    omega: theta,
                    chi: alternate_chi,
                    phi: alternate_phi,
                    tth,
                },
            ]);
        }

        let omega = ctx.current.require("omega")?;
        // Target direction in the omega frame: azimuth 90 deg + theta - omega.
        let azimuth = FRAC_PI_2 + theta - omega;
        let (target_x, target_y) = (azimuth.cos(), azimuth.sin());

        if in_plane < 1.0e-12 {
            if target_x.abs() > 1.0e-9 {
                return Err(DiffcalcError::calculation_failed(
                    "reflection along the phi axis is unreachable at this omega",
                ));
            }
            let chi = 0.0f64.atan2(target_y) - uz.atan2(0.0);
            return Ok(vec![Branch {
                omega,
                chi: normalize_angle(chi),
                phi: 0.0,
                tth,
            }]);
        }

        if target_x.abs() > in_plane + 1.0e-12 {
            return Err(DiffcalcError::calculation_failed(
                "reflection is unreachable with omega held constant",
            ));
        }

        let offset = uy.atan2(ux);
        let half_angle = (target_x / in_plane).clamp(-1.0, 1.0).acos();
        let mut branches = Vec::with_capacity(2);
        for phi in [half_angle - offset, -half_angle - offset] {
            let rotated_y = ux * phi.sin() + uy * phi.cos();
            let chi = 0.0f64.atan2(target_y) - uz.atan2(rotated_y);
            branches.push(Branch {
                omega,
                chi: normalize_angle(chi),
                phi: normalize_angle(phi),
                tth,
            });
        }
        Ok(branches)
    }

    fn candidate_from_branch(geometry: GeometryType, branch: Branch) -> GeometryCandidate {
        let axis_values = match geometry {
            GeometryType::E4ch | GeometryType::E4cv => {
                vec![branch.omega, branch.chi, branch.phi, branch.tth]
            }
            // mu, omega, chi, phi, gamma, delta with the vertical circles
            // zeroed
            GeometryType::E6c => vec![0.0, branch.omega, branch.chi, branch.phi, 0.0, branch.tth],
            GeometryType::TwoC => unreachable!("hkl engine is not registered for TwoC"),
        };
        GeometryCandidate { axis_values }
    }
}

impl GeometrySolver for EulerianHklSolver {
    fn solve(
        &self,
        ctx: &SolverContext<'_>,
        target: &[f64],
    ) -> DiffcalcResult<Vec<GeometryCandidate>> {
        let [h, k, l] = target else {
            return Err(DiffcalcError::invalid_shape(format!(
                "hkl engine expects 3 pseudo-axis values, got {}",
                target.len()
            )));
        };

        let q_phi = mat_vec(&ctx.ub, [*h, *k, *l]);
        let q_length = norm(q_phi);
        if q_length < 1.0e-12 {
            return Err(DiffcalcError::calculation_failed(
                "null scattering vector (hkl = 0)",
            ));
        }

        let sin_theta = q_length * ctx.current.wavelength / 2.0;
        if sin_theta > 1.0 {
            return Err(DiffcalcError::calculation_failed(format!(
                "reflection ({h}, {k}, {l}) is unreachable at wavelength {}",
                ctx.current.wavelength
            )));
        }
        let theta = sin_theta.asin();

        let unit_q = crate::support::math::scale(q_phi, 1.0 / q_length);
        let branches = Self::branches(ctx, unit_q, theta)?;
        tracing::trace!(
            mode = ctx.mode,
            branches = branches.len(),
            theta,
            "eulerian hkl branches computed"
        );

        let candidates = branches
            .into_iter()
            .map(|branch| Self::candidate_from_branch(ctx.meta.geometry, branch))
            .collect();
        filter_by_limits(candidates, ctx.limits)
    }

    fn forward(&self, ctx: &SolverContext<'_>) -> DiffcalcResult<Vec<f64>> {
        let q_sample = scattering_vector_sample(ctx.current)?;
        let ub_inverse = mat_inverse(&ctx.ub)
            .ok_or_else(|| DiffcalcError::calculation_failed("UB matrix is singular"))?;
        let hkl = mat_vec(&ub_inverse, q_sample);
        Ok(hkl.to_vec())
    }
}
