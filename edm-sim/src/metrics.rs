use uom::si::{
    f64::{Length, ThermodynamicTemperature, Time, Volume, VolumeRate},
    length::meter,
    thermodynamic_temperature::kelvin,
    time::second,
    volume::cubic_meter,
    volume_rate::cubic_meter_per_second,
};

use crate::PulseRecord;

/// Aggregate performance figures derived from a process history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub pulses: usize,

    /// Total process time.
    pub elapsed: Time,

    pub removed_cells: usize,

    /// Removed volume, `removed_cells · Δx³`.
    pub removed_volume: Volume,

    /// Material removal rate; `None` if no time has elapsed.
    pub removal_rate: Option<VolumeRate>,

    /// Highest recorded grid temperature; `None` for an empty history.
    pub peak_temperature: Option<ThermodynamicTemperature>,
}

impl Metrics {
    /// Summarizes a history recorded on a grid with cells of `cell_size`.
    #[must_use]
    pub fn from_history(history: &[PulseRecord], cell_size: Length) -> Self {
        let elapsed = history
            .last()
            .map_or(Time::new::<second>(0.0), |record| record.elapsed);

        let removed_cells: usize = history.iter().map(|record| record.removed).sum();

        #[allow(clippy::cast_precision_loss)]
        let volume = removed_cells as f64 * cell_size.get::<meter>().powi(3);

        let seconds = elapsed.get::<second>();
        let removal_rate = (seconds > 0.0)
            .then(|| VolumeRate::new::<cubic_meter_per_second>(volume / seconds));

        let peak_temperature = history
            .iter()
            .map(|record| record.max_temperature.get::<kelvin>())
            .reduce(f64::max)
            .map(ThermodynamicTemperature::new::<kelvin>);

        Self {
            pulses: history.len(),
            elapsed,
            removed_cells,
            removed_volume: Volume::new::<cubic_meter>(volume),
            removal_rate,
            peak_temperature,
        }
    }

    /// Returns the running total of removed cells at the end of each pulse.
    #[must_use]
    pub fn cumulative_removal(history: &[PulseRecord]) -> Vec<(Time, usize)> {
        history
            .iter()
            .scan(0, |total, record| {
                *total += record.removed;
                Some((record.elapsed, *total))
            })
            .collect()
    }
}
