//! Reciprocal-space calculation engine for multi-circle diffractometers.
//!
//! The central object is the [`CalcSession`]: it fixes one diffractometer
//! geometry type at construction, manages a registry of crystal samples
//! with their lattices, orientation matrices and recorded reflections, and
//! drives forward solves that turn pseudo-axis targets such as (h, k, l)
//! into ranked candidate configurations of the physical rotation axes.
//!
//! ```
//! use diffcalc_core::{CalcSession, Lattice, SessionOptions};
//!
//! let mut session = CalcSession::new("E4CV", SessionOptions::default())?;
//! session.set_wavelength(1.54)?;
//! session
//!     .sample_mut()
//!     .ok_or(diffcalc_core::DiffcalcError::SampleUnset)?
//!     .set_lattice(Lattice::cubic(5.431)?);
//!
//! let solutions = session.set_pseudo_values(&[1.0, 0.0, 0.0])?;
//! session.select_solution(solutions[0].id())?;
//! # Ok::<(), diffcalc_core::DiffcalcError>(())
//! ```

pub mod domain;
pub mod engine;
pub mod lattice;
pub mod parameter;
pub mod path;
pub mod sample;
pub mod session;
pub mod solver;
pub mod support;

pub use domain::{
    geometry_meta, valid_geometry_names, Detector, DetectorType, DiffcalcError, DiffcalcResult,
    EngineMeta, GeometryMeta, GeometryType, UnitSystem,
};
pub use engine::{Engine, Solution, SolutionId};
pub use lattice::Lattice;
pub use parameter::Parameter;
pub use path::{linear_path, PathSpec};
pub use sample::{Reflection, ReflectionId, Sample};
pub use session::{CalcSession, EngineGuard, SessionOptions, Trajectory};
pub use solver::{GeometryCandidate, GeometrySnapshot, GeometrySolver, SolverContext};
