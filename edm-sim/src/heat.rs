use std::f64::consts::PI;

use edm_core::{Material, ProcessParameters};
use ndarray::Zip;
use serde::{Deserialize, Serialize};
use uom::si::{
    electric_current::ampere,
    energy::joule,
    f64::{HeatFluxDensity, Length, TemperatureInterval},
    heat_flux_density::watt_per_square_meter,
    length::meter,
    temperature_interval,
    time::{microsecond, second},
};

use crate::grid::{Grid, Voxel};

/// Time base used to turn the peak flux into a temperature increment.
///
/// The increment is `ΔT = q(d)·τ / (ρ·c)`.
/// Process parameters quote pulse times in microseconds, and the empirical
/// law is calibrated with `τ` taken as that microsecond magnitude.
/// [`DepositionTime::Seconds`] uses the SI duration instead, which yields
/// increments six orders of magnitude smaller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositionTime {
    #[default]
    Microseconds,
    Seconds,
}

/// Constants of the empirical discharge heat law.
///
/// The plasma channel radius follows `r0 = k1 · I^a · t_on^b` with the
/// current in amperes and the pulse-on time in microseconds, giving meters.
/// Flux falls off radially as `q0 · exp(-falloff · (d / r0)²)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatLaw {
    pub radius_coefficient: f64,
    pub current_exponent: f64,
    pub pulse_on_exponent: f64,
    pub falloff: f64,
    pub deposition_time: DepositionTime,

    /// Skip cells farther than this many channel radii from the discharge.
    ///
    /// `None` heats every occupied cell, however small its share.
    pub cutoff_radii: Option<f64>,
}

impl Default for HeatLaw {
    fn default() -> Self {
        Self {
            radius_coefficient: 2.4e-5,
            current_exponent: 0.43,
            pulse_on_exponent: 0.44,
            falloff: 4.5,
            deposition_time: DepositionTime::Microseconds,
            cutoff_radii: None,
        }
    }
}

impl HeatLaw {
    /// Validates that the law produces a finite, positive channel radius and
    /// a non-increasing radial profile.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid constant.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.radius_coefficient.is_finite() || self.radius_coefficient <= 0.0 {
            return Err("radius_coefficient must be finite and positive");
        }
        if !self.current_exponent.is_finite() {
            return Err("current_exponent must be finite");
        }
        if !self.pulse_on_exponent.is_finite() {
            return Err("pulse_on_exponent must be finite");
        }
        if !self.falloff.is_finite() || self.falloff < 0.0 {
            return Err("falloff must be finite and non-negative");
        }
        if let Some(cutoff) = self.cutoff_radii {
            if !cutoff.is_finite() || cutoff <= 0.0 {
                return Err("cutoff_radii must be finite and positive");
            }
        }
        Ok(())
    }
}

/// Converts a discharge at a cell into a temperature increment field.
///
/// Everything that depends only on the material and process parameters is
/// evaluated once at construction, so each pulse is a single pass over the
/// grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatInjection {
    channel_radius: f64,
    peak_flux: f64,
    peak_increment: f64,
    falloff: f64,
    cutoff_squared: Option<f64>,
}

impl HeatInjection {
    /// Evaluates the heat law for a material and set of process parameters.
    ///
    /// The peak flux density is
    /// ```text
    /// q0 = η · U·I·t_on / (π · r0² · t_on)
    /// ```
    /// with `t_on` in seconds.
    #[must_use]
    pub fn new(law: &HeatLaw, material: &Material, params: &ProcessParameters) -> Self {
        let current = params.current.as_ref().get::<ampere>();
        let pulse_on = params.pulse_on.as_ref();
        let t_on_us = pulse_on.get::<microsecond>();
        let t_on_s = pulse_on.get::<second>();

        let channel_radius = law.radius_coefficient
            * current.powf(law.current_exponent)
            * t_on_us.powf(law.pulse_on_exponent);

        let spot_area = PI * channel_radius * channel_radius;
        let energy = params.pulse_energy().get::<joule>();
        let peak_flux = params.efficiency_fraction() * energy / (spot_area * t_on_s);

        let tau = match law.deposition_time {
            DepositionTime::Microseconds => t_on_us,
            DepositionTime::Seconds => t_on_s,
        };
        let peak_increment = peak_flux * tau / material.volumetric_heat_capacity();

        Self {
            channel_radius,
            peak_flux,
            peak_increment,
            falloff: law.falloff,
            cutoff_squared: law
                .cutoff_radii
                .map(|n| (n * channel_radius) * (n * channel_radius)),
        }
    }

    /// Characteristic radius of the heated spot.
    #[must_use]
    pub fn channel_radius(&self) -> Length {
        Length::new::<meter>(self.channel_radius)
    }

    /// Flux density at the discharge point.
    #[must_use]
    pub fn peak_flux(&self) -> HeatFluxDensity {
        HeatFluxDensity::new::<watt_per_square_meter>(self.peak_flux)
    }

    /// Temperature increment at the discharge point.
    #[must_use]
    pub fn peak_increment(&self) -> TemperatureInterval {
        TemperatureInterval::new::<temperature_interval::kelvin>(self.peak_increment)
    }

    /// Returns the temperature increment, in kelvin, at `distance` meters
    /// from the discharge point.
    #[must_use]
    pub fn increment_at(&self, distance: f64) -> f64 {
        let squared = distance * distance;
        if self.cutoff_squared.is_some_and(|cutoff| squared > cutoff) {
            return 0.0;
        }
        self.peak_increment * (-self.falloff * squared / (self.channel_radius * self.channel_radius)).exp()
    }

    /// Heats every occupied cell according to its distance from `point`.
    ///
    /// Unoccupied cells are left at ambient.
    pub fn apply(&self, grid: &mut Grid, point: Voxel) {
        if self.peak_increment == 0.0 {
            return;
        }

        let cell_size = grid.cell_size;
        #[allow(clippy::cast_precision_loss)]
        let [pi, pj, pk] = point.map(|n| n as f64);

        #[allow(clippy::cast_precision_loss)]
        let deposit = |(i, j, k): (usize, usize, usize), t: &mut f64, &occupied: &bool| {
            if !occupied {
                return;
            }
            let dx = i as f64 - pi;
            let dy = j as f64 - pj;
            let dz = k as f64 - pk;
            let distance = (dx * dx + dy * dy + dz * dz).sqrt() * cell_size;
            *t += self.increment_at(distance);
        };

        let zip = Zip::indexed(&mut grid.temperature).and(&grid.occupied);

        #[cfg(feature = "parallel")]
        zip.par_for_each(deposit);

        #[cfg(not(feature = "parallel"))]
        zip.for_each(deposit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::thermodynamic_temperature::kelvin;

    use crate::grid::GridSpec;

    fn reference_params(efficiency: f64) -> ProcessParameters {
        ProcessParameters::from_machine_units(300.0, 12.0, 600.0, 20.0, efficiency).unwrap()
    }

    fn grid(shape: [usize; 3]) -> Grid {
        let spec = GridSpec::new(shape, 1e-4);
        Grid::new(
            shape,
            spec.validate().unwrap(),
            uom::si::f64::ThermodynamicTemperature::new::<kelvin>(300.0),
        )
    }

    #[test]
    fn reference_values() {
        let heat = HeatInjection::new(&HeatLaw::default(), &Material::steel(), &reference_params(0.5));

        let r0 = 2.4e-5 * 12.0_f64.powf(0.43) * 600.0_f64.powf(0.44);
        assert_relative_eq!(heat.channel_radius().get::<meter>(), r0, max_relative = 1e-12);

        let q0 = 0.5 * 2.16 / (PI * r0 * r0 * 600e-6);
        assert_relative_eq!(
            heat.peak_flux().get::<watt_per_square_meter>(),
            q0,
            max_relative = 1e-9
        );

        let dt = q0 * 600.0 / (7850.0 * 486.0);
        assert_relative_eq!(
            heat.peak_increment().get::<temperature_interval::kelvin>(),
            dt,
            max_relative = 1e-9
        );
    }

    #[test]
    fn reference_increment_exceeds_vaporization_margin() {
        let heat = HeatInjection::new(&HeatLaw::default(), &Material::steel(), &reference_params(0.5));
        assert!(heat.increment_at(0.0) > 3273.0 - 300.0);
    }

    #[test]
    fn seconds_time_base_is_much_weaker() {
        let law = HeatLaw {
            deposition_time: DepositionTime::Seconds,
            ..HeatLaw::default()
        };
        let micro = HeatInjection::new(&HeatLaw::default(), &Material::steel(), &reference_params(0.5));
        let si = HeatInjection::new(&law, &Material::steel(), &reference_params(0.5));
        assert_relative_eq!(si.increment_at(0.0) * 1e6, micro.increment_at(0.0), max_relative = 1e-9);
    }

    #[test]
    fn increment_decays_monotonically() {
        let heat = HeatInjection::new(&HeatLaw::default(), &Material::steel(), &reference_params(0.5));
        let samples: Vec<f64> = (0..50).map(|n| heat.increment_at(f64::from(n) * 1e-4)).collect();
        assert!(samples.windows(2).all(|w| w[1] <= w[0]));
        assert!(samples.iter().all(|&dt| dt >= 0.0));
    }

    #[test]
    fn cutoff_zeroes_distant_cells() {
        let law = HeatLaw {
            cutoff_radii: Some(1.0),
            ..HeatLaw::default()
        };
        let heat = HeatInjection::new(&law, &Material::steel(), &reference_params(0.5));
        let r0 = heat.channel_radius().get::<meter>();
        assert!(heat.increment_at(0.99 * r0) > 0.0);
        assert_eq!(heat.increment_at(1.01 * r0), 0.0);
    }

    #[test]
    fn zero_efficiency_changes_nothing() {
        let heat = HeatInjection::new(&HeatLaw::default(), &Material::steel(), &reference_params(0.0));
        let mut grid = grid([5, 5, 5]);
        let before = grid.clone();
        heat.apply(&mut grid, [2, 2, 4]);
        assert_eq!(grid, before);
    }

    #[test]
    fn only_occupied_cells_are_heated() {
        let heat = HeatInjection::new(&HeatLaw::default(), &Material::steel(), &reference_params(0.5));
        let mut grid = grid([3, 3, 3]);
        grid.occupied[[0, 0, 0]] = false;
        grid.occupied_count -= 1;

        heat.apply(&mut grid, [1, 1, 2]);

        assert_eq!(grid.temperature[[0, 0, 0]], 300.0);
        assert!(grid.temperature[[2, 2, 0]] > 300.0);
        assert_relative_eq!(
            grid.temperature[[1, 1, 2]],
            300.0 + heat.increment_at(0.0),
            max_relative = 1e-12
        );
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn zip_deposit_matches_a_plain_loop() {
        let heat = HeatInjection::new(&HeatLaw::default(), &Material::steel(), &reference_params(0.5));
        let mut grid = grid([9, 8, 6]);
        for voxel in [[4, 4, 5], [0, 7, 2], [8, 0, 0]] {
            grid.occupied[voxel] = false;
            grid.occupied_count -= 1;
        }
        let point = [4, 3, 5];

        let mut expected = grid.temperature.clone();
        for ((i, j, k), t) in expected.indexed_iter_mut() {
            if !grid.occupied[[i, j, k]] {
                continue;
            }
            let dx = i as f64 - point[0] as f64;
            let dy = j as f64 - point[1] as f64;
            let dz = k as f64 - point[2] as f64;
            *t += heat.increment_at((dx * dx + dy * dy + dz * dz).sqrt() * 1e-4);
        }

        heat.apply(&mut grid, point);

        assert_eq!(grid.temperature, expected);
    }
}
