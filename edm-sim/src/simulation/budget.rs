use uom::si::f64::Time;

/// Limit on how long a call to [`Simulation::run`](crate::Simulation::run)
/// may continue.
///
/// Budgets count from the start of the call, so a simulation can be run in
/// several installments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Budget {
    /// Stop after this many pulses.
    Pulses(usize),

    /// Stop after as many whole pulse periods as fit in this duration.
    Time(Time),
}
