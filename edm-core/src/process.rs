use thiserror::Error;
use uom::si::{
    electric_current::ampere,
    electric_potential::volt,
    energy::joule,
    f64::{ElectricCurrent, ElectricPotential, Energy, Frequency, Ratio, Time},
    frequency::hertz,
    ratio::ratio,
    time::{microsecond, second},
};

use crate::constraint::{Constrained, ConstraintError, StrictlyPositive, UnitInterval};

/// Electrical and timing parameters of one discharge cycle.
///
/// Every pulse of a run shares the same parameters: a discharge of
/// `voltage · current` for `pulse_on`, followed by a recovery interval of
/// `pulse_off` during which the workpiece cools.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessParameters {
    pub voltage: Constrained<ElectricPotential, StrictlyPositive>,
    pub current: Constrained<ElectricCurrent, StrictlyPositive>,
    pub pulse_on: Constrained<Time, StrictlyPositive>,
    pub pulse_off: Constrained<Time, StrictlyPositive>,

    /// Fraction of the pulse energy that reaches the workpiece as heat.
    pub efficiency: Constrained<Ratio, UnitInterval>,
}

/// Unvalidated process parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessConfig {
    pub voltage: ElectricPotential,
    pub current: ElectricCurrent,
    pub pulse_on: Time,
    pub pulse_off: Time,
    pub efficiency: Ratio,
}

/// Errors that can occur when creating [`ProcessParameters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("process parameter `{parameter}` is invalid: {source}")]
pub struct ProcessError {
    pub parameter: &'static str,
    pub source: ConstraintError,
}

impl ProcessParameters {
    /// Creates validated process parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessError`] if the voltage, current, or either pulse
    /// time is not strictly positive and finite, or if the efficiency lies
    /// outside `[0, 1]`.
    pub fn new(config: ProcessConfig) -> Result<Self, ProcessError> {
        let ProcessConfig {
            voltage,
            current,
            pulse_on,
            pulse_off,
            efficiency,
        } = config;

        let invalid =
            |parameter: &'static str| move |source: ConstraintError| ProcessError { parameter, source };

        let params = Self {
            voltage: Constrained::new(voltage).map_err(invalid("voltage"))?,
            current: Constrained::new(current).map_err(invalid("current"))?,
            pulse_on: Constrained::new(pulse_on).map_err(invalid("pulse_on"))?,
            pulse_off: Constrained::new(pulse_off).map_err(invalid("pulse_off"))?,
            efficiency: Constrained::new(efficiency).map_err(invalid("efficiency"))?,
        };

        let magnitudes = [
            ("voltage", voltage.get::<volt>()),
            ("current", current.get::<ampere>()),
            ("pulse_on", pulse_on.get::<second>()),
            ("pulse_off", pulse_off.get::<second>()),
        ];
        match magnitudes.into_iter().find(|(_, value)| !value.is_finite()) {
            Some((parameter, _)) => Err(ProcessError {
                parameter,
                source: ConstraintError::NotFinite,
            }),
            None => Ok(params),
        }
    }

    /// Creates parameters from values in the units machine settings are
    /// usually quoted in: volts, amperes, microseconds, and a plain ratio.
    ///
    /// # Errors
    ///
    /// See [`ProcessParameters::new`].
    pub fn from_machine_units(
        voltage_v: f64,
        current_a: f64,
        pulse_on_us: f64,
        pulse_off_us: f64,
        efficiency: f64,
    ) -> Result<Self, ProcessError> {
        Self::new(ProcessConfig {
            voltage: ElectricPotential::new::<volt>(voltage_v),
            current: ElectricCurrent::new::<ampere>(current_a),
            pulse_on: Time::new::<microsecond>(pulse_on_us),
            pulse_off: Time::new::<microsecond>(pulse_off_us),
            efficiency: Ratio::new::<ratio>(efficiency),
        })
    }

    /// Returns the duration of one full discharge cycle, `t_on + t_off`.
    #[must_use]
    pub fn period(&self) -> Time {
        self.pulse_on.into_inner() + self.pulse_off.into_inner()
    }

    /// Returns the pulse repetition frequency, `1 / (t_on + t_off)`.
    #[must_use]
    pub fn frequency(&self) -> Frequency {
        Frequency::new::<hertz>(1.0 / self.period().get::<second>())
    }

    /// Returns the electrical energy of one pulse, `U·I·t_on`.
    #[must_use]
    pub fn pulse_energy(&self) -> Energy {
        Energy::new::<joule>(
            self.voltage.as_ref().get::<volt>()
                * self.current.as_ref().get::<ampere>()
                * self.pulse_on.as_ref().get::<second>(),
        )
    }

    /// Returns the efficiency as a plain fraction.
    #[must_use]
    pub fn efficiency_fraction(&self) -> f64 {
        self.efficiency.as_ref().get::<ratio>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn reference() -> ProcessParameters {
        ProcessParameters::from_machine_units(300.0, 12.0, 600.0, 20.0, 0.5).unwrap()
    }

    #[test]
    fn derived_timing() {
        let params = reference();
        assert_relative_eq!(params.period().get::<microsecond>(), 620.0, epsilon = 1e-9);
        assert_relative_eq!(params.frequency().get::<hertz>(), 1.0 / 620e-6, max_relative = 1e-12);
    }

    #[test]
    fn pulse_energy() {
        assert_relative_eq!(reference().pulse_energy().get::<joule>(), 2.16, max_relative = 1e-12);
    }

    #[test]
    fn zero_efficiency_is_a_dry_run() {
        let params = ProcessParameters::from_machine_units(300.0, 12.0, 600.0, 20.0, 0.0);
        assert!(params.is_ok());
    }

    #[test]
    fn rejects_invalid_values() {
        let cases = [
            ((0.0, 12.0, 600.0, 20.0, 0.5), "voltage"),
            ((300.0, -1.0, 600.0, 20.0, 0.5), "current"),
            ((300.0, 12.0, 0.0, 20.0, 0.5), "pulse_on"),
            ((300.0, 12.0, 600.0, 0.0, 0.5), "pulse_off"),
            ((300.0, 12.0, 600.0, 20.0, 1.2), "efficiency"),
            ((300.0, 12.0, 600.0, 20.0, -0.1), "efficiency"),
        ];

        for ((u, i, on, off, eta), expected) in cases {
            let err = ProcessParameters::from_machine_units(u, i, on, off, eta).unwrap_err();
            assert_eq!(err.parameter, expected);
        }
    }

    #[test]
    fn rejects_infinite_values() {
        let cases = [
            ((f64::INFINITY, 12.0, 600.0, 20.0, 0.5), "voltage"),
            ((300.0, f64::INFINITY, 600.0, 20.0, 0.5), "current"),
            ((300.0, 12.0, f64::INFINITY, 20.0, 0.5), "pulse_on"),
            ((300.0, 12.0, 600.0, f64::INFINITY, 0.5), "pulse_off"),
        ];

        for ((u, i, on, off, eta), expected) in cases {
            let err = ProcessParameters::from_machine_units(u, i, on, off, eta).unwrap_err();
            assert_eq!(
                err,
                ProcessError {
                    parameter: expected,
                    source: ConstraintError::NotFinite,
                }
            );
        }
    }
}
