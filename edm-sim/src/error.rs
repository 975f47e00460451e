use edm_core::{MaterialError, ProcessError, constraint::ConstraintError};
use thiserror::Error;

use crate::grid::Voxel;

/// Errors raised while assembling a [`Simulation`](crate::Simulation).
///
/// Configuration errors are fatal: nothing is simulated until every input
/// has been validated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("grid dimension `{axis}` must be at least one cell")]
    GridDimension { axis: char },

    #[error("grid of {shape:?} cells exceeds the addressable memory")]
    GridTooLarge { shape: [usize; 3] },

    #[error("cell size is invalid: {0}")]
    CellSize(ConstraintError),

    #[error(transparent)]
    Material(#[from] MaterialError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("invalid engine option `{option}`: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: &'static str,
    },

    #[error("unknown material preset `{0}`")]
    UnknownPreset(String),

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A numerical failure of the explicit cooling solver.
///
/// Any of these aborts the run.
/// The history recorded up to the failing pulse stays on the simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstabilityError {
    /// The explicit update coefficient exceeded one under the reject policy.
    #[error(
        "explicit step coefficient {coefficient:.4} exceeds the stability limit of 1 (dt = {dt_seconds:e} s)"
    )]
    StabilityBound { coefficient: f64, dt_seconds: f64 },

    /// Satisfying the bound would take more sub-steps than allowed.
    #[error("cooling interval needs {required} sub-steps, more than the limit of {limit}")]
    SubstepLimit { required: f64, limit: usize },

    /// A cell temperature left the range permitted by the maximum principle.
    #[error("temperature diverged at cell {voxel:?}: {kelvin} K is outside [{lower}, {upper}] K")]
    Divergence {
        voxel: Voxel,
        kelvin: f64,
        lower: f64,
        upper: f64,
    },
}

/// Error returned when a run aborts mid-pulse.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("numeric instability during pulse {pulse}: {source}")]
pub struct RunError {
    /// The one-based number of the pulse that failed.
    pub pulse: usize,
    pub source: InstabilityError,
}
