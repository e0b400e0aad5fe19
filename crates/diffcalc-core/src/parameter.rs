//! Single scalar axis quantity: a physical motor angle or an orientation
//! degree of freedom.
//!
//! The canonical value and bounds are stored in `Default` (radian) units;
//! every getter and setter converts according to the parameter's active
//! unit system. Conversion lives here and nowhere else.

use crate::domain::{DiffcalcError, DiffcalcResult, UnitSystem};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    // canonical radians
    value: f64,
    low: f64,
    high: f64,
    fit: bool,
    units: UnitSystem,
}

impl Parameter {
    /// A rotational axis initialized to zero with limits of +/-180 degrees.
    pub fn rotation(name: impl Into<String>, units: UnitSystem) -> Self {
        Self {
            name: name.into(),
            value: 0.0,
            low: -std::f64::consts::PI,
            high: std::f64::consts::PI,
            fit: true,
            units,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value in the active unit system.
    pub fn value(&self) -> f64 {
        self.units.angle_from_default(self.value)
    }

    /// Current value in an explicit unit system.
    pub fn value_in(&self, units: UnitSystem) -> f64 {
        units.angle_from_default(self.value)
    }

    /// Set the value, interpreted in the active unit system. Fails with a
    /// range error when the value falls outside the current limits; the
    /// previous value is kept on failure.
    pub fn set_value(&mut self, value: f64) -> DiffcalcResult<()> {
        self.set_value_in(self.units, value)
    }

    /// Set the value, interpreted in an explicit unit system.
    pub fn set_value_in(&mut self, units: UnitSystem, value: f64) -> DiffcalcResult<()> {
        let canonical = units.angle_to_default(value);
        if canonical < self.low || canonical > self.high {
            let (low, high) = self.limits();
            return Err(DiffcalcError::ValueOutOfRange {
                name: self.name.clone(),
                value: self.units.angle_from_default(canonical),
                low,
                high,
            });
        }
        self.value = canonical;
        Ok(())
    }

    /// `(low, high)` in the active unit system.
    pub fn limits(&self) -> (f64, f64) {
        (
            self.units.angle_from_default(self.low),
            self.units.angle_from_default(self.high),
        )
    }

    /// `(low, high)` in canonical radians.
    pub fn limits_default(&self) -> (f64, f64) {
        (self.low, self.high)
    }

    /// Replace both bounds atomically, interpreted in the active unit
    /// system. The current value is not revalidated; bounds only gate
    /// future writes.
    pub fn set_limits(&mut self, low: f64, high: f64) -> DiffcalcResult<()> {
        if low > high {
            return Err(DiffcalcError::InvalidLimits {
                name: self.name.clone(),
                low,
                high,
            });
        }
        self.low = self.units.angle_to_default(low);
        self.high = self.units.angle_to_default(high);
        Ok(())
    }

    /// Participation flag for orientation-refinement routines. No solving
    /// behavior is implied here.
    pub fn fit(&self) -> bool {
        self.fit
    }

    pub fn set_fit(&mut self, fit: bool) {
        self.fit = fit;
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    pub fn set_units(&mut self, units: UnitSystem) {
        self.units = units;
    }
}

#[cfg(test)]
mod tests {
    use super::{Parameter, UnitSystem};
    use crate::domain::DiffcalcError;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn limits_round_trip_exactly_in_user_units() {
        let mut omega = Parameter::rotation("omega", UnitSystem::User);
        omega.set_limits(0.0, 20.0).expect("ordered limits");
        let (low, high) = omega.limits();
        assert_close(low, 0.0, 1.0e-12);
        assert_close(high, 20.0, 1.0e-9);
    }

    #[test]
    fn out_of_range_write_keeps_the_previous_value() {
        let mut omega = Parameter::rotation("omega", UnitSystem::User);
        omega.set_value(15.0).expect("within default limits");
        omega.set_limits(0.0, 20.0).expect("ordered limits");

        let error = omega.set_value(25.0).expect_err("outside the limits");
        match error {
            DiffcalcError::ValueOutOfRange { name, low, high, .. } => {
                assert_eq!(name, "omega");
                assert_close(low, 0.0, 1.0e-12);
                assert_close(high, 20.0, 1.0e-9);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_close(omega.value(), 15.0, 1.0e-9);
    }

    #[test]
    fn values_convert_between_the_two_unit_systems() {
        let mut chi = Parameter::rotation("chi", UnitSystem::User);
        chi.set_value(90.0).expect("within limits");
        assert_close(chi.value_in(UnitSystem::Default), std::f64::consts::FRAC_PI_2, 1.0e-12);

        chi.set_units(UnitSystem::Default);
        assert_close(chi.value(), std::f64::consts::FRAC_PI_2, 1.0e-12);
        chi.set_value(0.5).expect("interpreted as radians now");
        assert_close(chi.value_in(UnitSystem::User), 0.5f64.to_degrees(), 1.0e-9);
    }

    #[test]
    fn inverted_limits_are_rejected() {
        let mut phi = Parameter::rotation("phi", UnitSystem::User);
        assert!(matches!(
            phi.set_limits(10.0, -10.0),
            Err(DiffcalcError::InvalidLimits { .. })
        ));
        // untouched
        let (low, high) = phi.limits();
        assert_close(low, -180.0, 1.0e-9);
        assert_close(high, 180.0, 1.0e-9);
    }

    #[test]
    fn fit_flag_is_plain_state() {
        let mut phi = Parameter::rotation("phi", UnitSystem::User);
        assert!(phi.fit());
        phi.set_fit(false);
        assert!(!phi.fit());
    }
}
