//! Voxel-based simulation of material removal by electrical discharge
//! machining.
//!
//! The workpiece is a regular 3D grid of cubic cells, each either occupied
//! by material or removed. Every discharge pulse
//!
//! 1. strikes the occupied cell nearest the tool tip,
//! 2. deposits heat following an empirical Gaussian flux law,
//! 3. vaporizes occupied cells hotter than the vaporization temperature,
//! 4. and lets the grid cool by conduction and convection over the
//!    pulse-off interval.
//!
//! [`Simulation`] drives this loop and records a [`PulseRecord`] per pulse.
//! [`Metrics`] summarizes a history, and [`ScenarioConfig`] reads a complete
//! run description from TOML.
//!
//! The library emits [`tracing`] events but never installs a subscriber.

mod config;
mod error;
mod grid;
mod metrics;
mod simulation;

pub mod conduction;
pub mod heat;
pub mod locator;
pub mod removal;
pub mod scenario;

pub use config::{EngineOptions, MAX_SEARCH_RETRIES};
pub use error::{ConfigError, InstabilityError, RunError};
pub use grid::{Grid, GridSpec, ToolPosition, Voxel};
pub use metrics::Metrics;
pub use scenario::ScenarioConfig;
pub use simulation::{
    Action, Budget, PulseEvent, PulseObserver, PulseRecord, RunSummary, Simulation, StepOutcome,
    StopReason,
};
