use uom::si::f64::Time;

use crate::{conduction::CoolingReport, grid::Voxel};

use super::PulseRecord;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No occupied cell was found, even after advancing the tool.
    NoReachableMaterial,

    /// Fewer occupied cells remain than the configured minimum.
    BelowViability { remaining: usize },

    /// The requested number of pulses completed.
    PulseBudget,

    /// The requested process time elapsed.
    TimeBudget,

    /// An observer asked the run to stop.
    Cancelled,
}

/// Result of a completed call to [`Simulation::run`](crate::Simulation::run).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub reason: StopReason,

    /// Pulses completed during this call.
    pub pulses: usize,

    /// Process time covered by this call.
    pub elapsed: Time,
}

/// Result of [`Simulation::step`](crate::Simulation::step).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// A pulse completed and was recorded.
    Pulse {
        discharge: Voxel,
        record: PulseRecord,
        cooling: CoolingReport,
    },

    /// No pulse was fired.
    Stopped(StopReason),
}

impl StepOutcome {
    /// Returns the recorded pulse, if one was fired.
    #[must_use]
    pub fn record(&self) -> Option<&PulseRecord> {
        match self {
            Self::Pulse { record, .. } => Some(record),
            Self::Stopped(_) => None,
        }
    }
}
