use std::cmp::Ordering;

use num_traits::Zero;

use super::{Constrained, Constraint, ConstraintError};

/// Marker type enforcing that a value is non-negative (zero or greater).
///
/// Used for quantities that may legitimately vanish, such as the latent heat
/// carried by a material record for information only.
///
/// # Examples
///
/// ```
/// use edm_core::constraint::NonNegative;
///
/// assert!(NonNegative::new(0.0).is_ok());
/// assert!(NonNegative::new(6.095e6).is_ok());
/// assert!(NonNegative::new(-1.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NonNegative;

impl NonNegative {
    /// Constructs `Constrained<T, NonNegative>` if the value is non-negative.
    ///
    /// # Errors
    ///
    /// - [`ConstraintError::Negative`] if the value is less than zero.
    /// - [`ConstraintError::NotANumber`] if comparison is undefined (e.g., NaN).
    pub fn new<T: PartialOrd + Zero>(
        value: T,
    ) -> Result<Constrained<T, NonNegative>, ConstraintError> {
        Constrained::<T, NonNegative>::new(value)
    }
}

impl<T: PartialOrd + Zero> Constraint<T> for NonNegative {
    fn check(value: &T) -> Result<(), ConstraintError> {
        match value.partial_cmp(&T::zero()) {
            Some(Ordering::Greater | Ordering::Equal) => Ok(()),
            Some(Ordering::Less) => Err(ConstraintError::Negative),
            None => Err(ConstraintError::NotANumber),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use uom::si::{available_energy::kilojoule_per_kilogram, f64::AvailableEnergy};

    #[test]
    fn floats() {
        assert!(NonNegative::new(2.0).is_ok(), "Positive value is ok");
        assert!(NonNegative::new(0.0).is_ok(), "Zero value is ok");
        assert_eq!(NonNegative::new(-2.0), Err(ConstraintError::Negative));
        assert_eq!(NonNegative::new(f64::NAN), Err(ConstraintError::NotANumber));
    }

    #[test]
    fn latent_heat() {
        let latent = AvailableEnergy::new::<kilojoule_per_kilogram>(4730.0);
        assert!(NonNegative::new(latent).is_ok());

        let negative = AvailableEnergy::new::<kilojoule_per_kilogram>(-1.0);
        assert!(NonNegative::new(negative).is_err());
    }
}
