//! The per-pulse orchestration loop.
//!
//! Every pulse runs the same sequence over the grid:
//!
//! ```text
//! SEARCH -> INJECT -> REMOVE -> COOL -> RECORD
//! ```
//!
//! Budgets and the viability threshold are checked between pulses, so a
//! pulse is never interrupted once it has started.
//!
//! # Example
//!
//! ```
//! use edm_core::{Material, ProcessParameters};
//! use edm_sim::{EngineOptions, GridSpec, Simulation, StopReason};
//!
//! let params = ProcessParameters::from_machine_units(300.0, 12.0, 600.0, 20.0, 0.5)?;
//! let mut sim = Simulation::new(
//!     Material::steel(),
//!     params,
//!     GridSpec::new([20, 20, 10], 1e-4),
//!     EngineOptions::default(),
//! )?;
//!
//! let summary = sim.run_pulses(3)?;
//! assert_eq!(summary.reason, StopReason::PulseBudget);
//! assert_eq!(sim.history().len(), 3);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod budget;
mod event;
mod history;
mod outcome;

pub use budget::Budget;
pub use event::{Action, PulseEvent, PulseObserver};
pub use history::PulseRecord;
pub use outcome::{RunSummary, StepOutcome, StopReason};

use edm_core::{Material, ProcessParameters};
use tracing::{debug, info, warn};
use uom::si::{
    f64::Time,
    length::meter,
    temperature_interval,
    thermodynamic_temperature::kelvin,
    time::{microsecond, second},
};

use crate::{
    ConfigError, EngineOptions, Metrics, RunError,
    conduction::ConductionSolver,
    grid::{Grid, GridSpec, ToolPosition, Voxel},
    heat::HeatInjection,
    locator::nearest_occupied,
    removal::RemovalRule,
};

/// A single EDM run: the workpiece grid, the tool, and the pulse history.
#[derive(Debug, Clone)]
pub struct Simulation {
    material: Material,
    params: ProcessParameters,
    options: EngineOptions,
    heat: HeatInjection,
    removal: RemovalRule,
    conduction: ConductionSolver,
    grid: Grid,
    tool: ToolPosition,
    history: Vec<PulseRecord>,
    elapsed: Time,
}

impl Simulation {
    /// Creates a simulation with a fully occupied grid at ambient temperature
    /// and the tool one layer above the centre of the top face.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the grid spec or engine options are
    /// invalid, or if the ambient temperature is not below the material's
    /// vaporization temperature.
    pub fn new(
        material: Material,
        params: ProcessParameters,
        spec: GridSpec,
        options: EngineOptions,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        let cell_size = spec.validate()?;

        if options.ambient >= material.vaporization_temperature() {
            return Err(ConfigError::InvalidOption {
                option: "ambient",
                reason: "must be below the material's vaporization temperature",
            });
        }

        let heat = HeatInjection::new(&options.heat_law, &material, &params);
        let removal = RemovalRule::new(&material);
        let conduction = ConductionSolver::new(
            &material,
            *cell_size.as_ref(),
            options.convection,
            options.stability,
        );

        let pulse_off = params.pulse_off.into_inner();
        let coefficient = conduction.step_coefficient(pulse_off);
        if coefficient > 1.0 {
            warn!(
                coefficient,
                max_stable_step_us = conduction.max_stable_step().get::<microsecond>(),
                policy = ?conduction.policy(),
                "pulse-off interval exceeds the explicit stability bound"
            );
        }

        debug!(
            material = %material.name,
            channel_radius_m = heat.channel_radius().get::<meter>(),
            peak_increment_k = heat.peak_increment().get::<temperature_interval::kelvin>(),
            fourier = conduction.fourier_number(pulse_off),
            "simulation configured"
        );

        let grid = Grid::new(spec.shape, cell_size, options.ambient);
        let tool = ToolPosition::above(spec.shape);

        Ok(Self {
            material,
            params,
            options,
            heat,
            removal,
            conduction,
            grid,
            tool,
            history: Vec::new(),
            elapsed: Time::new::<second>(0.0),
        })
    }

    /// Fires a single pulse, unless the grid is below the viability
    /// threshold or no material can be reached.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] if cooling becomes numerically unstable.
    /// The failed pulse is not recorded and the grid is left as the solver
    /// found it.
    pub fn step(&mut self) -> Result<StepOutcome, RunError> {
        let remaining = self.grid.occupied_count();
        if remaining < self.options.min_viable_cells {
            return Ok(StepOutcome::Stopped(StopReason::BelowViability { remaining }));
        }

        let Some(discharge) = self.search() else {
            return Ok(StepOutcome::Stopped(StopReason::NoReachableMaterial));
        };

        let pulse = self.history.len() + 1;

        self.heat.apply(&mut self.grid, discharge);
        let removed = self.removal.apply(&mut self.grid);
        let cooling = self
            .conduction
            .advance(&mut self.grid, self.params.pulse_off.into_inner())
            .map_err(|source| RunError { pulse, source })?;

        self.elapsed += self.params.period();
        let record = PulseRecord {
            elapsed: self.elapsed,
            max_temperature: self.grid.max_temperature(),
            removed,
        };
        self.history.push(record);

        debug!(
            pulse,
            ?discharge,
            removed,
            remaining = self.grid.occupied_count(),
            max_temperature_k = record.max_temperature.get::<kelvin>(),
            substeps = cooling.substeps,
            "pulse complete"
        );

        Ok(StepOutcome::Pulse {
            discharge,
            record,
            cooling,
        })
    }

    /// Runs until the budget is spent or another stop condition is met.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] if cooling becomes numerically unstable.
    /// Pulses recorded before the failure remain in [`Simulation::history`].
    pub fn run(&mut self, budget: Budget) -> Result<RunSummary, RunError> {
        self.run_observed(budget, ())
    }

    /// Runs like [`Simulation::run`], reporting each completed pulse to
    /// `observer`.
    ///
    /// The observer may return [`Action::StopEarly`] to end the run with
    /// [`StopReason::Cancelled`] before the next pulse.
    ///
    /// # Errors
    ///
    /// See [`Simulation::run`].
    pub fn run_observed<O>(&mut self, budget: Budget, mut observer: O) -> Result<RunSummary, RunError>
    where
        O: PulseObserver,
    {
        let (limit, exhausted) = match budget {
            Budget::Pulses(n) => (n, StopReason::PulseBudget),
            Budget::Time(duration) => (self.pulses_in(duration), StopReason::TimeBudget),
        };

        info!(
            material = %self.material.name,
            limit,
            occupied = self.grid.occupied_count(),
            "starting run"
        );

        let first = self.history.len();
        let start = self.elapsed;

        let reason = loop {
            if self.history.len() - first >= limit {
                break exhausted;
            }

            let (discharge, record, cooling) = match self.step()? {
                StepOutcome::Stopped(reason) => break reason,
                StepOutcome::Pulse {
                    discharge,
                    record,
                    cooling,
                } => (discharge, record, cooling),
            };

            let pulse = self.history.len();
            let interval = self.options.progress_interval;
            if interval > 0 && pulse % interval == 0 {
                info!(
                    pulse,
                    removed = self.grid.removed_count(),
                    depth = self.grid.removal_depth(),
                    elapsed_s = self.elapsed.get::<second>(),
                    "progress"
                );
            }

            let event = PulseEvent {
                pulse,
                discharge,
                record: &record,
                cooling,
                grid: &self.grid,
            };
            if let Some(Action::StopEarly) = observer.observe(&event) {
                break StopReason::Cancelled;
            }
        };

        let summary = RunSummary {
            reason,
            pulses: self.history.len() - first,
            elapsed: self.elapsed - start,
        };

        info!(
            reason = ?summary.reason,
            pulses = summary.pulses,
            removed = self.grid.removed_count(),
            "run finished"
        );

        Ok(summary)
    }

    /// Runs at most `pulses` pulses.
    ///
    /// # Errors
    ///
    /// See [`Simulation::run`].
    pub fn run_pulses(&mut self, pulses: usize) -> Result<RunSummary, RunError> {
        self.run(Budget::Pulses(pulses))
    }

    /// Runs for as many whole pulse periods as fit in `duration`.
    ///
    /// # Errors
    ///
    /// See [`Simulation::run`].
    pub fn run_for(&mut self, duration: Time) -> Result<RunSummary, RunError> {
        self.run(Budget::Time(duration))
    }

    /// Returns how many whole pulse periods fit in `duration`.
    ///
    /// Durations within a billionth of a period of the next whole pulse
    /// count as reaching it.
    #[must_use]
    pub fn pulses_in(&self, duration: Time) -> usize {
        let periods = (duration / self.params.period()).value;
        if !periods.is_finite() || periods <= 0.0 {
            return 0;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pulses = (periods + 1e-9).floor() as usize;
        pulses
    }

    #[must_use]
    pub fn material(&self) -> &Material {
        &self.material
    }

    #[must_use]
    pub fn params(&self) -> &ProcessParameters {
        &self.params
    }

    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    #[must_use]
    pub fn heat(&self) -> &HeatInjection {
        &self.heat
    }

    #[must_use]
    pub fn conduction(&self) -> &ConductionSolver {
        &self.conduction
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn tool(&self) -> ToolPosition {
        self.tool
    }

    #[must_use]
    pub fn history(&self) -> &[PulseRecord] {
        &self.history
    }

    /// Process time covered by all recorded pulses.
    #[must_use]
    pub fn elapsed(&self) -> Time {
        self.elapsed
    }

    /// Summarizes the history recorded so far.
    #[must_use]
    pub fn metrics(&self) -> Metrics {
        Metrics::from_history(&self.history, self.grid.cell_size())
    }

    /// Consumes the simulation, returning the final grid and history.
    #[must_use]
    pub fn into_parts(self) -> (Grid, Vec<PulseRecord>) {
        (self.grid, self.history)
    }

    /// Locates the discharge point, advancing the tool one cell deeper after
    /// each miss.
    fn search(&mut self) -> Option<Voxel> {
        for _ in 0..=self.options.max_search_retries {
            if let Some(voxel) = nearest_occupied(&self.grid, self.tool) {
                return Some(voxel);
            }
            self.tool.advance_depth();
            warn!(depth = self.tool.z, "no occupied cell found, advancing tool");
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn params(efficiency: f64) -> ProcessParameters {
        ProcessParameters::from_machine_units(300.0, 12.0, 600.0, 20.0, efficiency).unwrap()
    }

    fn simulation(shape: [usize; 3], efficiency: f64, options: EngineOptions) -> Simulation {
        Simulation::new(
            Material::steel(),
            params(efficiency),
            GridSpec::new(shape, 1e-4),
            options,
        )
        .unwrap()
    }

    #[test]
    fn first_pulse_strikes_below_the_tool() {
        let mut sim = simulation([20, 20, 10], 0.5, EngineOptions::default());

        let outcome = sim.step().unwrap();

        let StepOutcome::Pulse {
            discharge, record, ..
        } = outcome
        else {
            panic!("expected a pulse, got {outcome:?}");
        };
        assert_eq!(discharge, [10, 10, 9]);
        assert!(!sim.grid().is_occupied(discharge));
        assert!(record.removed > 0);
        assert_relative_eq!(record.elapsed.get::<microsecond>(), 620.0, max_relative = 1e-12);
    }

    #[test]
    fn pulse_count_fits_in_duration() {
        let sim = simulation([4, 4, 4], 0.0, EngineOptions::default());
        let period = sim.params().period();

        assert_eq!(sim.pulses_in(period * 10.0), 10);
        assert_eq!(sim.pulses_in(period * 2.5), 2);
        assert_eq!(sim.pulses_in(Time::new::<second>(0.0)), 0);
        assert_eq!(sim.pulses_in(Time::new::<second>(-1.0)), 0);
    }

    #[test]
    fn search_advances_the_tool_and_gives_up() {
        let options = EngineOptions {
            min_viable_cells: 0,
            max_search_retries: 2,
            ..EngineOptions::default()
        };
        let mut sim = simulation([2, 2, 2], 0.0, options);
        sim.grid.occupied.fill(false);
        sim.grid.occupied_count = 0;

        let outcome = sim.step().unwrap();

        assert_eq!(outcome, StepOutcome::Stopped(StopReason::NoReachableMaterial));
        assert_eq!(sim.tool().z, 2 - 3);
        assert!(sim.history().is_empty());
    }

    #[test]
    fn viability_is_checked_before_searching() {
        let mut sim = simulation([2, 2, 2], 0.0, EngineOptions::default());

        assert_eq!(
            sim.step().unwrap(),
            StepOutcome::Stopped(StopReason::BelowViability { remaining: 8 })
        );
        assert_eq!(sim.tool(), ToolPosition::above([2, 2, 2]));
    }

    #[test]
    fn ambient_must_be_below_vaporization() {
        let options = EngineOptions {
            ambient: uom::si::f64::ThermodynamicTemperature::new::<kelvin>(4000.0),
            ..EngineOptions::default()
        };
        let result = Simulation::new(
            Material::steel(),
            params(0.5),
            GridSpec::new([4, 4, 4], 1e-4),
            options,
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidOption {
                option: "ambient",
                ..
            })
        ));
    }
}
