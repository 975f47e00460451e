use crate::{
    conduction::CoolingReport,
    grid::{Grid, Voxel},
};

use super::PulseRecord;

/// Control actions an observer may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the run before the next pulse.
    StopEarly,
}

/// Event emitted to the observer after each completed pulse.
#[derive(Debug, Clone, Copy)]
pub struct PulseEvent<'a> {
    /// One-based pulse number over the lifetime of the simulation.
    pub pulse: usize,

    /// Cell the discharge struck.
    pub discharge: Voxel,

    /// History entry appended for this pulse.
    pub record: &'a PulseRecord,

    pub cooling: CoolingReport,

    /// Grid state after cooling.
    pub grid: &'a Grid,
}

/// Watches a run pulse by pulse and may cancel it.
///
/// [`Simulation::run_observed`](crate::Simulation::run_observed) calls
/// [`PulseObserver::observe`] once per completed pulse, after cooling.
/// Returning [`Action::StopEarly`] ends the run with
/// [`StopReason::Cancelled`](crate::StopReason::Cancelled).
///
/// Any closure taking `&PulseEvent<'_>` is an observer. The `()` observer
/// never cancels.
pub trait PulseObserver {
    fn observe(&mut self, event: &PulseEvent<'_>) -> Option<Action>;
}

impl<F> PulseObserver for F
where
    F: FnMut(&PulseEvent<'_>) -> Option<Action>,
{
    fn observe(&mut self, event: &PulseEvent<'_>) -> Option<Action> {
        self(event)
    }
}

impl PulseObserver for () {
    fn observe(&mut self, _event: &PulseEvent<'_>) -> Option<Action> {
        None
    }
}
