use edm_core::Material;
use ndarray::{Zip, s};
use serde::{Deserialize, Serialize};
use uom::si::{
    f64::{HeatTransfer, Length, Time},
    heat_transfer::watt_per_square_meter_kelvin,
    length::meter,
    time::second,
};

use crate::{InstabilityError, grid::Grid};

/// How the solver responds when a cooling interval violates the explicit
/// stability bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum StabilityPolicy {
    /// Split the interval into the fewest equal sub-steps that satisfy the
    /// bound, failing if more than `max_substeps` would be needed.
    SubStep { max_substeps: usize },

    /// Fail instead of stepping.
    Reject,

    /// Take a single step regardless of the bound.
    ///
    /// The divergence check still applies.
    Unchecked,
}

impl Default for StabilityPolicy {
    fn default() -> Self {
        Self::SubStep {
            max_substeps: 10_000,
        }
    }
}

/// Summary of one call to [`ConductionSolver::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoolingReport {
    /// Number of explicit steps taken to cover the interval.
    pub substeps: usize,
}

/// Explicit finite-difference solver for conduction and convective loss.
///
/// Each step applies the seven-point FTCS update
/// ```text
/// T' = T + Fo · (Σ T_nb - 6·T) + β·dt · (T_amb - T)
/// ```
/// to occupied interior cells, where `Fo = α·dt/Δx²` and
/// `β = h·A / (ρ·c·V)` with `A = 6·Δx²` and `V = Δx³`.
/// Cells on any face of the grid are not updated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConductionSolver {
    diffusivity: f64,
    loss_rate: f64,
    cell_size: f64,
    policy: StabilityPolicy,
}

impl ConductionSolver {
    #[must_use]
    pub fn new(
        material: &Material,
        cell_size: Length,
        convection: HeatTransfer,
        policy: StabilityPolicy,
    ) -> Self {
        let dx = cell_size.get::<meter>();
        let h = convection.get::<watt_per_square_meter_kelvin>();
        Self {
            diffusivity: material.thermal_diffusivity(),
            loss_rate: 6.0 * h / (material.volumetric_heat_capacity() * dx),
            cell_size: dx,
            policy,
        }
    }

    #[must_use]
    pub fn policy(&self) -> StabilityPolicy {
        self.policy
    }

    /// Returns the grid Fourier number `α·dt/Δx²` for a step of `dt`.
    #[must_use]
    pub fn fourier_number(&self, dt: Time) -> f64 {
        self.diffusivity * dt.get::<second>() / (self.cell_size * self.cell_size)
    }

    /// Returns the centre coefficient `6·Fo + β·dt`.
    ///
    /// A single explicit step is stable when this is at most one.
    #[must_use]
    pub fn step_coefficient(&self, dt: Time) -> f64 {
        6.0 * self.fourier_number(dt) + self.loss_rate * dt.get::<second>()
    }

    /// Returns the longest single step that satisfies the stability bound.
    #[must_use]
    pub fn max_stable_step(&self) -> Time {
        let rate = 6.0 * self.diffusivity / (self.cell_size * self.cell_size) + self.loss_rate;
        Time::new::<second>(1.0 / rate)
    }

    /// Returns the number of sub-steps the policy would take for `dt`.
    ///
    /// # Errors
    ///
    /// Returns an [`InstabilityError`] if the policy refuses the interval.
    pub fn substeps_for(&self, dt: Time) -> Result<usize, InstabilityError> {
        let coefficient = self.step_coefficient(dt);
        match self.policy {
            StabilityPolicy::Unchecked => Ok(1),
            _ if coefficient <= 1.0 => Ok(1),
            StabilityPolicy::Reject => Err(InstabilityError::StabilityBound {
                coefficient,
                dt_seconds: dt.get::<second>(),
            }),
            StabilityPolicy::SubStep { max_substeps } => {
                let required = coefficient.ceil();
                #[allow(clippy::cast_precision_loss)]
                let limit = max_substeps as f64;
                if !required.is_finite() || required > limit {
                    return Err(InstabilityError::SubstepLimit {
                        required,
                        limit: max_substeps,
                    });
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let substeps = required as usize;
                Ok(substeps)
            }
        }
    }

    /// Advances the temperature field by `dt`.
    ///
    /// # Errors
    ///
    /// Returns an [`InstabilityError`] if the policy refuses the interval or
    /// if any step leaves an occupied cell outside the range allowed by the
    /// discrete maximum principle.
    pub fn advance(&self, grid: &mut Grid, dt: Time) -> Result<CoolingReport, InstabilityError> {
        let substeps = self.substeps_for(dt)?;

        #[allow(clippy::cast_precision_loss)]
        let h = dt.get::<second>() / substeps as f64;
        for _ in 0..substeps {
            self.explicit_step(grid, h)?;
        }

        Ok(CoolingReport { substeps })
    }

    fn explicit_step(&self, grid: &mut Grid, dt: f64) -> Result<(), InstabilityError> {
        let [nx, ny, nz] = grid.shape();
        if nx < 3 || ny < 3 || nz < 3 {
            return Ok(());
        }

        let ambient = grid.ambient;
        let snapshot = grid.temperature.clone();
        let (lower, upper) = snapshot
            .iter()
            .fold((ambient, ambient), |(lo, hi), &t| (lo.min(t), hi.max(t)));

        let fourier = self.diffusivity * dt / (self.cell_size * self.cell_size);
        let loss = self.loss_rate * dt;

        let update = |(i, j, k): (usize, usize, usize), t: &mut f64, &occupied: &bool| {
            if !occupied {
                return;
            }
            let (i, j, k) = (i + 1, j + 1, k + 1);
            let centre = snapshot[[i, j, k]];
            let neighbours = snapshot[[i + 1, j, k]]
                + snapshot[[i - 1, j, k]]
                + snapshot[[i, j + 1, k]]
                + snapshot[[i, j - 1, k]]
                + snapshot[[i, j, k + 1]]
                + snapshot[[i, j, k - 1]];
            *t = centre + fourier * (neighbours - 6.0 * centre) + loss * (ambient - centre);
        };

        let zip = Zip::indexed(grid.temperature.slice_mut(s![1..nx - 1, 1..ny - 1, 1..nz - 1]))
            .and(grid.occupied.slice(s![1..nx - 1, 1..ny - 1, 1..nz - 1]));

        #[cfg(feature = "parallel")]
        zip.par_for_each(update);

        #[cfg(not(feature = "parallel"))]
        zip.for_each(update);

        let tolerance = 1e-9 * upper.abs().max(lower.abs()).max(1.0);
        let offending = grid
            .temperature
            .indexed_iter()
            .zip(grid.occupied.iter())
            .find(|&((_, &t), &occupied)| {
                occupied && !(t.is_finite() && t >= lower - tolerance && t <= upper + tolerance)
            });

        match offending {
            Some((((i, j, k), &kelvin), _)) => Err(InstabilityError::Divergence {
                voxel: [i, j, k],
                kelvin,
                lower,
                upper,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::{f64::ThermodynamicTemperature, thermodynamic_temperature::kelvin};

    use crate::grid::GridSpec;

    const DX: f64 = 1e-4;

    fn grid(shape: [usize; 3]) -> Grid {
        let spec = GridSpec::new(shape, DX);
        Grid::new(
            shape,
            spec.validate().unwrap(),
            ThermodynamicTemperature::new::<kelvin>(300.0),
        )
    }

    fn solver(policy: StabilityPolicy) -> ConductionSolver {
        ConductionSolver::new(
            &Material::steel(),
            Length::new::<meter>(DX),
            HeatTransfer::new::<watt_per_square_meter_kelvin>(50.0),
            policy,
        )
    }

    /// Interval giving a Fourier number of `fo` on the test grid.
    fn interval(fo: f64) -> Time {
        Time::new::<second>(fo * DX * DX / Material::steel().thermal_diffusivity())
    }

    #[test]
    fn reference_pulse_off_is_stable() {
        let solver = solver(StabilityPolicy::default());
        let dt = Time::new::<second>(20e-6);
        assert_relative_eq!(
            solver.fourier_number(dt),
            30.0 / (7850.0 * 486.0) * 20e-6 / 1e-8,
            max_relative = 1e-12
        );
        assert!(solver.step_coefficient(dt) < 1.0);
        assert_eq!(solver.substeps_for(dt), Ok(1));
    }

    #[test]
    fn max_stable_step_sits_on_the_bound() {
        let solver = solver(StabilityPolicy::Reject);
        let dt = solver.max_stable_step();
        assert_relative_eq!(solver.step_coefficient(dt), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn hot_cell_spreads_and_conserves_bounds() {
        let solver = solver(StabilityPolicy::default());
        let mut grid = grid([5, 5, 5]);
        grid.temperature[[2, 2, 2]] = 1000.0;

        let report = solver.advance(&mut grid, interval(0.1)).unwrap();

        assert_eq!(report.substeps, 1);
        assert!(grid.temperature[[2, 2, 2]] < 1000.0);
        assert!(grid.temperature[[1, 2, 2]] > 300.0);
        assert!(grid.temperature[[3, 2, 2]] > 300.0);
        assert_relative_eq!(grid.temperature[[1, 2, 2]], grid.temperature[[3, 2, 2]]);
        assert!(grid.temperatures().iter().all(|&t| (300.0..=1000.0).contains(&t)));
    }

    #[test]
    fn boundary_layer_does_not_diffuse() {
        let solver = solver(StabilityPolicy::default());
        let mut grid = grid([5, 5, 5]);
        grid.temperature[[2, 2, 4]] = 1000.0;
        grid.temperature[[0, 2, 2]] = 800.0;

        solver.advance(&mut grid, interval(0.1)).unwrap();

        assert_eq!(grid.temperature[[2, 2, 4]], 1000.0);
        assert_eq!(grid.temperature[[0, 2, 2]], 800.0);
        assert_eq!(grid.temperature[[2, 2, 0]], 300.0);
        // Interior neighbours still feel the hot faces.
        assert!(grid.temperature[[2, 2, 3]] > 300.0);
        assert!(grid.temperature[[1, 2, 2]] > 300.0);
    }

    #[test]
    fn thin_grids_are_unchanged() {
        let solver = solver(StabilityPolicy::default());
        let mut grid = grid([2, 2, 2]);
        grid.temperature[[1, 1, 1]] = 900.0;
        let before = grid.clone();

        solver.advance(&mut grid, interval(0.1)).unwrap();

        assert_eq!(grid, before);
    }

    #[test]
    fn removed_cells_stay_at_ambient() {
        let solver = solver(StabilityPolicy::default());
        let mut grid = grid([5, 5, 5]);
        grid.occupied[[2, 2, 2]] = false;
        grid.occupied_count -= 1;
        grid.temperature[[2, 2, 3]] = 1000.0;

        solver.advance(&mut grid, interval(0.1)).unwrap();

        assert_eq!(grid.temperature[[2, 2, 2]], 300.0);
    }

    #[test]
    fn convection_cools_towards_ambient() {
        let solver = solver(StabilityPolicy::default());
        let mut grid = grid([3, 3, 3]);
        grid.temperature.fill(500.0);

        solver.advance(&mut grid, Time::new::<second>(1e-3)).unwrap();

        let centre = grid.temperature[[1, 1, 1]];
        assert!(centre < 500.0);
        assert!(centre > 300.0);
    }

    #[test]
    fn substeps_split_long_intervals() {
        let solver = solver(StabilityPolicy::default());
        let dt = interval(0.5);
        let expected = solver.step_coefficient(dt).ceil();

        let mut grid = grid([5, 5, 5]);
        grid.temperature[[2, 2, 2]] = 1000.0;
        let report = solver.advance(&mut grid, dt).unwrap();

        #[allow(clippy::cast_precision_loss)]
        let substeps = report.substeps as f64;
        assert_relative_eq!(substeps, expected);
        assert!(report.substeps > 1);
        assert!(grid.temperatures().iter().all(|&t| (300.0..=1000.0).contains(&t)));
    }

    #[test]
    fn substep_limit_is_enforced() {
        let solver = solver(StabilityPolicy::SubStep { max_substeps: 2 });
        let mut grid = grid([5, 5, 5]);

        assert!(matches!(
            solver.advance(&mut grid, interval(1.0)),
            Err(InstabilityError::SubstepLimit { limit: 2, .. })
        ));
    }

    #[test]
    fn reject_policy_refuses_unstable_steps() {
        let solver = solver(StabilityPolicy::Reject);
        let mut grid = grid([5, 5, 5]);
        let before = grid.clone();

        assert!(matches!(
            solver.advance(&mut grid, interval(0.5)),
            Err(InstabilityError::StabilityBound { .. })
        ));
        assert_eq!(grid, before);
    }

    #[test]
    fn unchecked_policy_reports_divergence() {
        let solver = solver(StabilityPolicy::Unchecked);
        let mut grid = grid([5, 5, 5]);
        grid.temperature[[2, 2, 2]] = 1000.0;

        let err = solver.advance(&mut grid, interval(0.5)).unwrap_err();

        match err {
            InstabilityError::Divergence {
                voxel,
                kelvin: value,
                lower,
                upper,
            } => {
                assert_eq!(voxel, [2, 2, 2]);
                assert!(value < lower);
                assert_relative_eq!(lower, 300.0);
                assert_relative_eq!(upper, 1000.0);
            }
            other => panic!("expected divergence, got {other:?}"),
        }
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn zip_step_matches_a_plain_loop() {
        let solver = solver(StabilityPolicy::Unchecked);
        let mut grid = grid([7, 6, 5]);
        for ((i, j, k), t) in grid.temperature.indexed_iter_mut() {
            *t = 300.0 + 50.0 * ((i * 31 + j * 17 + k * 7) % 11) as f64;
        }
        for voxel in [[3, 3, 2], [1, 2, 3]] {
            grid.occupied[voxel] = false;
            grid.occupied_count -= 1;
            grid.temperature[voxel] = 300.0;
        }

        let dt = interval(0.1);
        let fourier = solver.diffusivity * dt.get::<second>() / (DX * DX);
        let loss = solver.loss_rate * dt.get::<second>();
        let t = grid.temperature.clone();
        let mut expected = t.clone();
        for i in 1..6 {
            for j in 1..5 {
                for k in 1..4 {
                    if !grid.occupied[[i, j, k]] {
                        continue;
                    }
                    let centre = t[[i, j, k]];
                    let neighbours = t[[i + 1, j, k]]
                        + t[[i - 1, j, k]]
                        + t[[i, j + 1, k]]
                        + t[[i, j - 1, k]]
                        + t[[i, j, k + 1]]
                        + t[[i, j, k - 1]];
                    expected[[i, j, k]] =
                        centre + fourier * (neighbours - 6.0 * centre) + loss * (300.0 - centre);
                }
            }
        }

        let report = solver.advance(&mut grid, dt).unwrap();

        assert_eq!(report.substeps, 1);
        assert_eq!(grid.temperature, expected);
    }
}
