//! # Scenario From TOML
//!
//! Builds and runs a simulation described by a TOML scenario file.
//! Without an argument the bundled `scenarios/steel.toml` is used.
//!
//! ```sh
//! cargo run --example from_config -- path/to/scenario.toml
//! ```

use std::{env, fs};

use edm_examples::{init_tracing, report};
use edm_sim::ScenarioConfig;

const BUNDLED: &str = include_str!("../scenarios/steel.toml");

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let text = match env::args().nth(1) {
        Some(path) => fs::read_to_string(path)?,
        None => BUNDLED.to_owned(),
    };

    let scenario = ScenarioConfig::from_toml_str(&text)?;
    let mut sim = scenario.build()?;
    let summary = sim.run(scenario.budget()?)?;

    println!("{}", report(&sim, &summary));
    Ok(())
}
