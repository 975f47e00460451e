//! # Steel Drilling
//!
//! Fires discharges into a steel block and tracks how deep the crater
//! grows. The run stops after 200 pulses, or earlier if the block is
//! exhausted or the crater reaches half the block depth.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example steel_drilling
//! ```

use edm_core::{Material, ProcessParameters};
use edm_examples::{init_tracing, report};
use edm_sim::{Action, Budget, EngineOptions, GridSpec, Metrics, PulseEvent, Simulation};
use tracing::info;
use uom::si::{frequency::hertz, length::millimeter, time::millisecond};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let shape = [40, 40, 20];
    let params = ProcessParameters::from_machine_units(300.0, 12.0, 600.0, 20.0, 0.5)?;
    let mut sim = Simulation::new(
        Material::steel(),
        params,
        GridSpec::new(shape, 1e-4),
        EngineOptions::default(),
    )?;

    info!(
        frequency_hz = sim.params().frequency().get::<hertz>(),
        channel_radius_mm = sim.heat().channel_radius().get::<millimeter>(),
        "generator settings"
    );

    let target_depth = shape[2] / 2;
    let summary = sim.run_observed(Budget::Pulses(200), |event: &PulseEvent<'_>| {
        let depth = event.grid.removal_depth();
        (depth >= target_depth).then(|| {
            info!(pulse = event.pulse, depth, "target depth reached");
            Action::StopEarly
        })
    })?;

    println!("{}", report(&sim, &summary));

    println!("\ncumulative removal:");
    for (elapsed, total) in Metrics::cumulative_removal(sim.history()).iter().step_by(10) {
        println!("  {:>8.3} ms  {total:>6} cells", elapsed.get::<millisecond>());
    }

    Ok(())
}
