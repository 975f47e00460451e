use thiserror::Error;
use uom::si::{
    available_energy::kilojoule_per_kilogram,
    f64::{
        AvailableEnergy, MassDensity, SpecificHeatCapacity, ThermalConductivity,
        ThermodynamicTemperature,
    },
    mass_density::kilogram_per_cubic_meter,
    specific_heat_capacity::joule_per_kilogram_kelvin,
    thermal_conductivity::watt_per_meter_kelvin,
    thermodynamic_temperature::kelvin,
};

use crate::constraint::{Constrained, ConstraintError, NonNegative, StrictlyPositive};

/// Physical constants of a workpiece material.
///
/// A `Material` is immutable once built and is shared by reference for the
/// lifetime of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub density: Constrained<MassDensity, StrictlyPositive>,
    pub thermal_conductivity: Constrained<ThermalConductivity, StrictlyPositive>,
    pub specific_heat: Constrained<SpecificHeatCapacity, StrictlyPositive>,
    vaporization_temperature: ThermodynamicTemperature,

    /// Carried for reporting; the removal rule does not consume it.
    pub latent_heat_vaporization: Constrained<AvailableEnergy, NonNegative>,
}

/// Unvalidated material properties.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialConfig {
    pub name: String,
    pub density: MassDensity,
    pub thermal_conductivity: ThermalConductivity,
    pub specific_heat: SpecificHeatCapacity,
    pub vaporization_temperature: ThermodynamicTemperature,
    pub latent_heat_vaporization: AvailableEnergy,
}

/// Errors that can occur when creating a [`Material`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MaterialError {
    #[error("material `{name}`: {property} is invalid: {source}")]
    Property {
        name: String,
        property: &'static str,
        source: ConstraintError,
    },
    #[error("material `{name}`: vaporization temperature must be above 0 K, got {value_k} K")]
    VaporizationTemperature { name: String, value_k: f64 },
}

impl Material {
    /// Creates a new `Material` from unvalidated properties.
    ///
    /// # Errors
    ///
    /// Returns a [`MaterialError`] naming the first property that is not
    /// physically meaningful.
    pub fn new(config: MaterialConfig) -> Result<Self, MaterialError> {
        let MaterialConfig {
            name,
            density,
            thermal_conductivity,
            specific_heat,
            vaporization_temperature,
            latent_heat_vaporization,
        } = config;

        let property = |property: &'static str| {
            let name = name.clone();
            move |source: ConstraintError| MaterialError::Property {
                name,
                property,
                source,
            }
        };

        let density = Constrained::new(density).map_err(property("density"))?;
        let thermal_conductivity =
            Constrained::new(thermal_conductivity).map_err(property("thermal conductivity"))?;
        let specific_heat =
            Constrained::new(specific_heat).map_err(property("specific heat"))?;
        let latent_heat_vaporization = Constrained::new(latent_heat_vaporization)
            .map_err(property("latent heat of vaporization"))?;

        let magnitudes = [
            ("density", density.as_ref().get::<kilogram_per_cubic_meter>()),
            (
                "thermal conductivity",
                thermal_conductivity.as_ref().get::<watt_per_meter_kelvin>(),
            ),
            (
                "specific heat",
                specific_heat.as_ref().get::<joule_per_kilogram_kelvin>(),
            ),
            (
                "latent heat of vaporization",
                latent_heat_vaporization.as_ref().get::<kilojoule_per_kilogram>(),
            ),
        ];
        if let Some((infinite, _)) = magnitudes.into_iter().find(|(_, value)| !value.is_finite()) {
            return Err(property(infinite)(ConstraintError::NotFinite));
        }

        let t_vap = vaporization_temperature.get::<kelvin>();
        if !(t_vap.is_finite() && t_vap > 0.0) {
            return Err(MaterialError::VaporizationTemperature {
                name,
                value_k: t_vap,
            });
        }

        Ok(Self {
            name,
            density,
            thermal_conductivity,
            specific_heat,
            vaporization_temperature,
            latent_heat_vaporization,
        })
    }

    /// Structural steel, as used in the reference drilling scenario.
    #[must_use]
    pub fn steel() -> Self {
        Self::preset("steel", 7850.0, 30.0, 486.0, 3273.0, 6095.0)
    }

    /// Electrolytic copper.
    #[must_use]
    pub fn copper() -> Self {
        Self::preset("copper", 8960.0, 401.0, 385.0, 2835.0, 4730.0)
    }

    /// Looks up a built-in material by name (case-insensitive).
    #[must_use]
    pub fn from_preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "steel" => Some(Self::steel()),
            "copper" => Some(Self::copper()),
            _ => None,
        }
    }

    /// Returns the temperature above which an occupied cell vaporizes.
    #[must_use]
    pub fn vaporization_temperature(&self) -> ThermodynamicTemperature {
        self.vaporization_temperature
    }

    /// Returns the volumetric heat capacity `ρ·c` in J/(m³·K).
    #[must_use]
    pub fn volumetric_heat_capacity(&self) -> f64 {
        self.density.as_ref().get::<kilogram_per_cubic_meter>()
            * self.specific_heat.as_ref().get::<joule_per_kilogram_kelvin>()
    }

    /// Returns the thermal diffusivity `α = k / (ρ·c)` in m²/s.
    #[must_use]
    pub fn thermal_diffusivity(&self) -> f64 {
        self.thermal_conductivity
            .as_ref()
            .get::<watt_per_meter_kelvin>()
            / self.volumetric_heat_capacity()
    }

    fn preset(
        name: &str,
        density: f64,
        conductivity: f64,
        specific_heat: f64,
        t_vap: f64,
        latent_kj: f64,
    ) -> Self {
        Self::new(MaterialConfig {
            name: name.to_owned(),
            density: MassDensity::new::<kilogram_per_cubic_meter>(density),
            thermal_conductivity: ThermalConductivity::new::<watt_per_meter_kelvin>(conductivity),
            specific_heat: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(specific_heat),
            vaporization_temperature: ThermodynamicTemperature::new::<kelvin>(t_vap),
            latent_heat_vaporization: AvailableEnergy::new::<kilojoule_per_kilogram>(latent_kj),
        })
        .expect("preset constants are physically valid")
    }
}
