//! Shared helpers for the `edm-examples` binaries.

use edm_sim::{Metrics, RunSummary, Simulation};
use tracing_subscriber::EnvFilter;
use uom::si::{
    length::millimeter,
    thermodynamic_temperature::kelvin,
    time::millisecond,
    volume::cubic_millimeter,
    volume_rate::cubic_millimeter_per_second,
};

/// Installs a formatting subscriber filtered by `RUST_LOG`, defaulting to
/// `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Renders a plain-text summary of a finished run.
#[must_use]
pub fn report(sim: &Simulation, summary: &RunSummary) -> String {
    let Metrics {
        pulses,
        elapsed,
        removed_cells,
        removed_volume,
        removal_rate,
        peak_temperature,
    } = sim.metrics();

    let grid = sim.grid();
    let [nx, ny, nz] = grid.shape();

    let mut lines = vec![
        format!("material:          {}", sim.material().name),
        format!("grid:              {nx} x {ny} x {nz} cells"),
        format!("stopped:           {:?}", summary.reason),
        format!("pulses:            {pulses}"),
        format!("process time:      {:.3} ms", elapsed.get::<millisecond>()),
        format!(
            "removed:           {removed_cells} cells ({:.4} mm³)",
            removed_volume.get::<cubic_millimeter>()
        ),
        format!(
            "feature depth:     {} cells ({:.3} mm)",
            grid.removal_depth(),
            grid.removal_depth_length().get::<millimeter>()
        ),
    ];

    if let Some(rate) = removal_rate {
        lines.push(format!(
            "removal rate:      {:.4} mm³/s",
            rate.get::<cubic_millimeter_per_second>()
        ));
    }
    if let Some(peak) = peak_temperature {
        lines.push(format!("peak temperature:  {:.1} K", peak.get::<kelvin>()));
    }

    lines.join("\n")
}
