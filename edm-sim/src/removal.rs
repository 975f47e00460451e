use edm_core::Material;
use ndarray::Zip;
use uom::si::thermodynamic_temperature::kelvin;

use crate::grid::Grid;

/// Vaporizes occupied cells that exceed the material's vaporization
/// temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemovalRule {
    threshold: f64,
}

impl RemovalRule {
    #[must_use]
    pub fn new(material: &Material) -> Self {
        Self {
            threshold: material.vaporization_temperature().get::<kelvin>(),
        }
    }

    /// Clears every occupied cell strictly hotter than the threshold and
    /// resets cleared cells to ambient.
    ///
    /// Returns the number of cells removed by this call.
    pub fn apply(&self, grid: &mut Grid) -> usize {
        let threshold = self.threshold;
        let ambient = grid.ambient;
        let mut removed = 0;

        Zip::from(&mut grid.occupied)
            .and(&mut grid.temperature)
            .for_each(|occupied, t| {
                if *occupied && *t > threshold {
                    *occupied = false;
                    removed += 1;
                }
                if !*occupied {
                    *t = ambient;
                }
            });

        grid.occupied_count -= removed;
        removed
    }
}
