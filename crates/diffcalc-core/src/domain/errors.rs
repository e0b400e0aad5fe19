pub type DiffcalcResult<T> = Result<T, DiffcalcError>;

/// Every failure in this crate is local to the call that raised it; prior
/// session state (active sample, active engine, recorded reflections) is
/// left untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiffcalcError {
    #[error("unknown geometry type '{requested}'; choose from: {available}")]
    UnknownGeometry {
        requested: String,
        available: String,
    },
    #[error("unknown engine '{requested}' for geometry {geometry}; choose from: {available}")]
    UnknownEngine {
        requested: String,
        geometry: String,
        available: String,
    },
    #[error("unknown mode '{requested}' for engine '{engine}'; choose from: {available}")]
    UnknownMode {
        requested: String,
        engine: String,
        available: String,
    },
    #[error("unknown axis '{requested}'")]
    UnknownAxis { requested: String },
    #[error("sample '{name}' already exists in the registry")]
    DuplicateSample { name: String },
    #[error("unknown sample '{name}'")]
    UnknownSample { name: String },
    #[error("no active sample bound to the session")]
    SampleUnset,
    #[error("engine is locked on this session; active engine '{active}' cannot be replaced")]
    EngineLocked { active: String },
    #[error("value {value} for '{name}' is outside the limits [{low}, {high}]")]
    ValueOutOfRange {
        name: String,
        value: f64,
        low: f64,
        high: f64,
    },
    #[error("invalid limits for '{name}': low {low} exceeds high {high}")]
    InvalidLimits { name: String, low: f64, high: f64 },
    #[error("invalid lattice parameters: {detail}")]
    InvalidLattice { detail: String },
    #[error("orientation matrix is not orthonormal (deviation {deviation:.3e})")]
    InvalidOrientation { deviation: f64 },
    #[error("no reflection with hkl ({h}, {k}, {l})")]
    ReflectionNotFound { h: f64, k: f64, l: f64 },
    #[error("unknown reflection handle {id}")]
    UnknownReflection { id: u64 },
    #[error("wavelength must be positive, got {value}")]
    InvalidWavelength { value: f64 },
    #[error("calculation failed ({detail})")]
    CalculationFailed { detail: String },
    #[error("solution handle {generation}:{index} does not match a pending solution set")]
    StaleSolution { generation: u64, index: usize },
    #[error("invalid target shape: {detail}")]
    InvalidShape { detail: String },
}

impl DiffcalcError {
    pub fn calculation_failed(detail: impl Into<String>) -> Self {
        Self::CalculationFailed {
            detail: detail.into(),
        }
    }

    pub fn invalid_shape(detail: impl Into<String>) -> Self {
        Self::InvalidShape {
            detail: detail.into(),
        }
    }

    /// Solve failures are recoverable; everything else in the taxonomy is a
    /// configuration error raised before any state was mutated.
    pub const fn is_calculation_failure(&self) -> bool {
        matches!(self, Self::CalculationFailed { .. })
    }
}
