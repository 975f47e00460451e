//! TOML scenario files.
//!
//! A scenario bundles everything needed to start a run:
//!
//! ```toml
//! [material]
//! preset = "steel"
//!
//! [process]
//! voltage_v = 300.0
//! current_a = 12.0
//! pulse_on_us = 600.0
//! pulse_off_us = 20.0
//! efficiency = 0.5
//!
//! [grid]
//! shape = [20, 20, 10]
//! cell_size_m = 1e-4
//!
//! [engine.stability]
//! policy = "sub_step"
//! max_substeps = 10000
//!
//! [run]
//! pulses = 50
//! ```
//!
//! Only `process` and `grid` are required.
//! Quantities are plain numbers in the units named by their keys.

use edm_core::{Material, MaterialConfig, ProcessParameters};
use serde::{Deserialize, Serialize};
use uom::si::{
    available_energy::joule_per_kilogram,
    f64::{
        AvailableEnergy, HeatTransfer, MassDensity, SpecificHeatCapacity, ThermalConductivity,
        ThermodynamicTemperature, Time,
    },
    heat_transfer::watt_per_square_meter_kelvin,
    mass_density::kilogram_per_cubic_meter,
    specific_heat_capacity::joule_per_kilogram_kelvin,
    thermal_conductivity::watt_per_meter_kelvin,
    thermodynamic_temperature::kelvin,
    time::second,
};

use crate::{
    Budget, ConfigError, EngineOptions, GridSpec, Simulation, conduction::StabilityPolicy,
    heat::HeatLaw,
};

/// Pulses run when a scenario sets no budget.
pub const DEFAULT_PULSES: usize = 100;

/// A complete run description, usually read from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub material: MaterialSection,
    pub process: ProcessSection,
    pub grid: GridSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub run: RunSection,
}

/// Either a built-in preset or a full set of properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaterialSection {
    Preset {
        preset: String,
    },
    Custom {
        name: String,
        density_kg_m3: f64,
        conductivity_w_mk: f64,
        specific_heat_j_kgk: f64,
        vaporization_temperature_k: f64,
        #[serde(default)]
        latent_heat_j_kg: f64,
    },
}

impl Default for MaterialSection {
    fn default() -> Self {
        Self::Preset {
            preset: "steel".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessSection {
    pub voltage_v: f64,
    pub current_a: f64,
    pub pulse_on_us: f64,
    pub pulse_off_us: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSection {
    pub shape: [usize; 3],
    pub cell_size_m: f64,
}

/// Engine options in plain units; omitted keys take the engine defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub ambient_k: f64,
    pub convection_w_m2k: f64,
    pub min_viable_cells: usize,
    pub max_search_retries: usize,
    pub progress_interval: usize,
    pub stability: StabilityPolicy,
    pub heat_law: HeatLaw,
}

impl Default for EngineSection {
    fn default() -> Self {
        let options = EngineOptions::default();
        Self {
            ambient_k: options.ambient.get::<kelvin>(),
            convection_w_m2k: options.convection.get::<watt_per_square_meter_kelvin>(),
            min_viable_cells: options.min_viable_cells,
            max_search_retries: options.max_search_retries,
            progress_interval: options.progress_interval,
            stability: options.stability,
            heat_law: options.heat_law,
        }
    }
}

impl From<EngineSection> for EngineOptions {
    fn from(section: EngineSection) -> Self {
        Self {
            ambient: ThermodynamicTemperature::new::<kelvin>(section.ambient_k),
            convection: HeatTransfer::new::<watt_per_square_meter_kelvin>(section.convection_w_m2k),
            min_viable_cells: section.min_viable_cells,
            max_search_retries: section.max_search_retries,
            stability: section.stability,
            heat_law: section.heat_law,
            progress_interval: section.progress_interval,
        }
    }
}

/// Run budget: a pulse count or a process duration, not both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub pulses: Option<usize>,
    pub duration_s: Option<f64>,
}

impl ScenarioConfig {
    /// Parses a scenario from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not a valid scenario.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Resolves the material section.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unknown preset or invalid properties.
    pub fn material(&self) -> Result<Material, ConfigError> {
        match &self.material {
            MaterialSection::Preset { preset } => {
                Material::from_preset(preset).ok_or_else(|| ConfigError::UnknownPreset(preset.clone()))
            }
            MaterialSection::Custom {
                name,
                density_kg_m3,
                conductivity_w_mk,
                specific_heat_j_kgk,
                vaporization_temperature_k,
                latent_heat_j_kg,
            } => Ok(Material::new(MaterialConfig {
                name: name.clone(),
                density: MassDensity::new::<kilogram_per_cubic_meter>(*density_kg_m3),
                thermal_conductivity: ThermalConductivity::new::<watt_per_meter_kelvin>(
                    *conductivity_w_mk,
                ),
                specific_heat: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(
                    *specific_heat_j_kgk,
                ),
                vaporization_temperature: ThermodynamicTemperature::new::<kelvin>(
                    *vaporization_temperature_k,
                ),
                latent_heat_vaporization: AvailableEnergy::new::<joule_per_kilogram>(
                    *latent_heat_j_kg,
                ),
            })?),
        }
    }

    /// Validates the process section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Process`] naming the invalid parameter.
    pub fn process(&self) -> Result<ProcessParameters, ConfigError> {
        let ProcessSection {
            voltage_v,
            current_a,
            pulse_on_us,
            pulse_off_us,
            efficiency,
        } = self.process;
        Ok(ProcessParameters::from_machine_units(
            voltage_v,
            current_a,
            pulse_on_us,
            pulse_off_us,
            efficiency,
        )?)
    }

    #[must_use]
    pub fn grid_spec(&self) -> GridSpec {
        GridSpec::new(self.grid.shape, self.grid.cell_size_m)
    }

    #[must_use]
    pub fn engine_options(&self) -> EngineOptions {
        self.engine.into()
    }

    /// Returns the run budget, defaulting to [`DEFAULT_PULSES`] pulses.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] if both a pulse count and a
    /// duration are set, or if the duration is negative or not finite.
    pub fn budget(&self) -> Result<Budget, ConfigError> {
        match (self.run.pulses, self.run.duration_s) {
            (Some(_), Some(_)) => Err(ConfigError::InvalidOption {
                option: "run",
                reason: "set either `pulses` or `duration_s`, not both",
            }),
            (Some(pulses), None) => Ok(Budget::Pulses(pulses)),
            (None, Some(seconds)) if seconds.is_finite() && seconds >= 0.0 => {
                Ok(Budget::Time(Time::new::<second>(seconds)))
            }
            (None, Some(_)) => Err(ConfigError::InvalidOption {
                option: "run",
                reason: "`duration_s` must be finite and non-negative",
            }),
            (None, None) => Ok(Budget::Pulses(DEFAULT_PULSES)),
        }
    }

    /// Builds a validated simulation from the scenario.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found in any section.
    pub fn build(&self) -> Result<Simulation, ConfigError> {
        Simulation::new(
            self.material()?,
            self.process()?,
            self.grid_spec(),
            self.engine_options(),
        )
    }
}
