use uom::si::f64::{ThermodynamicTemperature, Time};

/// One entry of the process history, appended after every pulse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseRecord {
    /// Process time at the end of the pulse, counted from the first pulse.
    pub elapsed: Time,

    /// Highest temperature anywhere in the grid after cooling.
    pub max_temperature: ThermodynamicTemperature,

    /// Cells vaporized by this pulse.
    pub removed: usize,
}
