//! Crystal lattice parameters and the derived reciprocal basis.
//!
//! Lengths are in angstroms; angles are held in radians internally and
//! converted at the API boundary according to the requested [`UnitSystem`].
//! The dual basis carries no 2-pi factor, so taking the reciprocal twice
//! reproduces the original cell.

use crate::domain::{DiffcalcError, DiffcalcResult, UnitSystem};
use crate::support::math::Mat3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    a: f64,
    b: f64,
    c: f64,
    // radians
    alpha: f64,
    beta: f64,
    gamma: f64,
}

impl Lattice {
    /// Build a lattice from the six cell parameters. Angles are interpreted
    /// in `units`. Fails when an edge is non-positive, an angle falls
    /// outside (0, 180) degrees, or the angles cannot close a cell.
    pub fn new(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
        units: UnitSystem,
    ) -> DiffcalcResult<Self> {
        let alpha = units.angle_to_default(alpha);
        let beta = units.angle_to_default(beta);
        let gamma = units.angle_to_default(gamma);

        if !(a > 0.0 && b > 0.0 && c > 0.0) {
            return Err(DiffcalcError::InvalidLattice {
                detail: format!("edges must be positive, got a={a}, b={b}, c={c}"),
            });
        }
        for (name, angle) in [("alpha", alpha), ("beta", beta), ("gamma", gamma)] {
            if !(angle > 0.0 && angle < std::f64::consts::PI) {
                return Err(DiffcalcError::InvalidLattice {
                    detail: format!("{name} must lie in (0, 180) degrees"),
                });
            }
        }

        let lattice = Self {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
        };
        if lattice.volume_factor() <= 0.0 {
            return Err(DiffcalcError::InvalidLattice {
                detail: "cell angles do not close a positive-volume cell".to_string(),
            });
        }
        Ok(lattice)
    }

    /// Cubic convenience cell, edge in angstroms.
    pub fn cubic(a: f64) -> DiffcalcResult<Self> {
        Self::new(a, a, a, 90.0, 90.0, 90.0, UnitSystem::User)
    }

    /// The 1.54 angstrom cubic cell new samples start from.
    pub(crate) fn default_cell() -> Self {
        Self {
            a: 1.54,
            b: 1.54,
            c: 1.54,
            alpha: std::f64::consts::FRAC_PI_2,
            beta: std::f64::consts::FRAC_PI_2,
            gamma: std::f64::consts::FRAC_PI_2,
        }
    }

    /// The six parameters `(a, b, c, alpha, beta, gamma)` with angles in the
    /// requested unit system.
    pub fn parameters(&self, units: UnitSystem) -> [f64; 6] {
        [
            self.a,
            self.b,
            self.c,
            units.angle_from_default(self.alpha),
            units.angle_from_default(self.beta),
            units.angle_from_default(self.gamma),
        ]
    }

    fn volume_factor(&self) -> f64 {
        let (ca, cb, cg) = (self.alpha.cos(), self.beta.cos(), self.gamma.cos());
        1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg
    }

    /// Unit-cell volume in cubic angstroms.
    pub fn volume(&self) -> f64 {
        self.a * self.b * self.c * self.volume_factor().sqrt()
    }

    /// The dual (reciprocal) lattice, computed fresh on every call.
    pub fn reciprocal(&self) -> Lattice {
        let volume = self.volume();
        let (sa, sb, sg) = (self.alpha.sin(), self.beta.sin(), self.gamma.sin());
        let (ca, cb, cg) = (self.alpha.cos(), self.beta.cos(), self.gamma.cos());

        let a_star = self.b * self.c * sa / volume;
        let b_star = self.a * self.c * sb / volume;
        let c_star = self.a * self.b * sg / volume;
        let alpha_star = ((cb * cg - ca) / (sb * sg)).clamp(-1.0, 1.0).acos();
        let beta_star = ((ca * cg - cb) / (sa * sg)).clamp(-1.0, 1.0).acos();
        let gamma_star = ((ca * cb - cg) / (sa * sb)).clamp(-1.0, 1.0).acos();

        Lattice {
            a: a_star,
            b: b_star,
            c: c_star,
            alpha: alpha_star,
            beta: beta_star,
            gamma: gamma_star,
        }
    }

    /// Busing-Levy B matrix: maps (h, k, l) onto Cartesian coordinates in
    /// the crystal frame, in reciprocal angstroms (no 2-pi factor).
    pub fn b_matrix(&self) -> Mat3 {
        let dual = self.reciprocal();
        let [a_star, b_star, c_star, alpha_star, beta_star, gamma_star] =
            dual.parameters(UnitSystem::Default);

        [
            [
                a_star,
                b_star * gamma_star.cos(),
                c_star * beta_star.cos(),
            ],
            [
                0.0,
                b_star * gamma_star.sin(),
                -c_star * beta_star.sin() * self.alpha.cos(),
            ],
            [0.0, 0.0, 1.0 / self.c],
        ]
    }
}
