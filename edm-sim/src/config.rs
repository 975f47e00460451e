use uom::si::{
    f64::{HeatTransfer, ThermodynamicTemperature},
    heat_transfer::watt_per_square_meter_kelvin,
    thermodynamic_temperature::kelvin,
};

use crate::{ConfigError, conduction::StabilityPolicy, heat::HeatLaw};

/// Upper bound on [`EngineOptions::max_search_retries`].
pub const MAX_SEARCH_RETRIES: usize = 1_000;

/// Engine settings that are independent of the material and process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    /// Temperature of the surroundings and of every removed cell.
    pub ambient: ThermodynamicTemperature,

    /// Convective heat transfer coefficient to the surroundings.
    pub convection: HeatTransfer,

    /// The run stops once fewer cells than this remain occupied.
    pub min_viable_cells: usize,

    /// How many times the tool may advance one cell deeper when a search
    /// finds no material before the run stops.
    ///
    /// At most [`MAX_SEARCH_RETRIES`].
    pub max_search_retries: usize,

    pub stability: StabilityPolicy,

    pub heat_law: HeatLaw,

    /// Pulses between `info`-level progress logs; zero disables them.
    pub progress_interval: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            ambient: ThermodynamicTemperature::new::<kelvin>(300.0),
            convection: HeatTransfer::new::<watt_per_square_meter_kelvin>(50.0),
            min_viable_cells: 10,
            max_search_retries: 3,
            stability: StabilityPolicy::default(),
            heat_law: HeatLaw::default(),
            progress_interval: 100,
        }
    }
}

impl EngineOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] naming the first option that
    /// is not physically meaningful.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |option, reason| Err(ConfigError::InvalidOption { option, reason });

        let ambient = self.ambient.get::<kelvin>();
        if !ambient.is_finite() || ambient <= 0.0 {
            return invalid("ambient", "must be finite and above 0 K");
        }

        let h = self.convection.get::<watt_per_square_meter_kelvin>();
        if !h.is_finite() || h < 0.0 {
            return invalid("convection", "must be finite and non-negative");
        }

        if self.max_search_retries > MAX_SEARCH_RETRIES {
            return invalid("max_search_retries", "must be at most 1000");
        }

        if let StabilityPolicy::SubStep { max_substeps: 0 } = self.stability {
            return invalid("stability", "max_substeps must be at least one");
        }

        self.heat_law
            .validate()
            .or_else(|reason| invalid("heat_law", reason))
    }
}
