//! Diffractometer geometry registry and shared value enums.
//!
//! The geometry set is a fixed enumeration: each variant registers its
//! physical axis names and the engines its native solver backends support.
//! A factory lookup maps a type tag to that metadata; there is no runtime
//! type synthesis.

pub mod errors;

pub use errors::{DiffcalcError, DiffcalcResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The two recognized unit systems. `User` is caller-facing (angles in
/// degrees), `Default` is solver-native (angles in radians). The active
/// system is carried explicitly in configuration, never as a process-wide
/// global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitSystem {
    #[default]
    User,
    Default,
}

impl UnitSystem {
    /// Convert an angle expressed in this unit system to radians.
    pub fn angle_to_default(self, value: f64) -> f64 {
        match self {
            Self::User => value.to_radians(),
            Self::Default => value,
        }
    }

    /// Convert an angle held in radians into this unit system.
    pub fn angle_from_default(self, value: f64) -> f64 {
        match self {
            Self::User => value.to_degrees(),
            Self::Default => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    E4ch,
    E4cv,
    E6c,
    TwoC,
}

impl GeometryType {
    pub const ALL: [GeometryType; 4] = [Self::E4ch, Self::E4cv, Self::E6c, Self::TwoC];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::E4ch => "E4CH",
            Self::E4cv => "E4CV",
            Self::E6c => "E6C",
            Self::TwoC => "TwoC",
        }
    }

    pub fn from_name(name: &str) -> DiffcalcResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|geometry| geometry.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| DiffcalcError::UnknownGeometry {
                requested: name.to_string(),
                available: valid_geometry_names(),
            })
    }
}

impl Display for GeometryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

pub fn valid_geometry_names() -> String {
    GeometryType::ALL
        .iter()
        .map(|geometry| geometry.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Static description of one calculation engine: its pseudo-axis names and
/// the constraint modes its solver backend understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineMeta {
    pub name: &'static str,
    pub pseudo_axes: &'static [&'static str],
    pub modes: &'static [&'static str],
}

/// Static description of one geometry variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryMeta {
    pub geometry: GeometryType,
    pub physical_axes: &'static [&'static str],
    pub engines: &'static [EngineMeta],
}

const HKL_ENGINE_E4C: EngineMeta = EngineMeta {
    name: "hkl",
    pseudo_axes: &["h", "k", "l"],
    modes: &["bissector", "constant_omega"],
};

const HKL_ENGINE_E6C: EngineMeta = EngineMeta {
    name: "hkl",
    pseudo_axes: &["h", "k", "l"],
    modes: &["bissector_vertical", "constant_omega_vertical"],
};

const Q_ENGINE: EngineMeta = EngineMeta {
    name: "q",
    pseudo_axes: &["q"],
    modes: &["q"],
};

const E4CH_META: GeometryMeta = GeometryMeta {
    geometry: GeometryType::E4ch,
    physical_axes: &["omega", "chi", "phi", "tth"],
    engines: &[HKL_ENGINE_E4C, Q_ENGINE],
};

const E4CV_META: GeometryMeta = GeometryMeta {
    geometry: GeometryType::E4cv,
    physical_axes: &["omega", "chi", "phi", "tth"],
    engines: &[HKL_ENGINE_E4C, Q_ENGINE],
};

const E6C_META: GeometryMeta = GeometryMeta {
    geometry: GeometryType::E6c,
    physical_axes: &["mu", "omega", "chi", "phi", "gamma", "delta"],
    engines: &[HKL_ENGINE_E6C, Q_ENGINE],
};

const TWOC_META: GeometryMeta = GeometryMeta {
    geometry: GeometryType::TwoC,
    physical_axes: &["omega", "tth"],
    engines: &[Q_ENGINE],
};

/// Factory lookup from a geometry tag to its registered metadata.
pub const fn geometry_meta(geometry: GeometryType) -> &'static GeometryMeta {
    match geometry {
        GeometryType::E4ch => &E4CH_META,
        GeometryType::E4cv => &E4CV_META,
        GeometryType::E6c => &E6C_META,
        GeometryType::TwoC => &TWOC_META,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DetectorType {
    #[default]
    Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Detector {
    dtype: DetectorType,
}

impl Detector {
    pub const fn new(dtype: DetectorType) -> Self {
        Self { dtype }
    }

    pub const fn point() -> Self {
        Self::new(DetectorType::Point)
    }

    pub const fn detector_type(self) -> DetectorType {
        self.dtype
    }
}
