use edm_core::constraint::{Constrained, StrictlyPositive};
use ndarray::{Array3, ArrayView3};
use uom::si::{
    f64::{Length, ThermodynamicTemperature, Volume},
    length::meter,
    thermodynamic_temperature::kelvin,
    volume::cubic_meter,
};

use crate::ConfigError;

/// Index of a cell as `[i, j, k]` along the x, y, and z axes.
///
/// The z axis points up: `k = nz - 1` is the top face of the workpiece.
pub type Voxel = [usize; 3];

/// Requested size and resolution of the workpiece grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    /// Number of cells along x, y, and z.
    pub shape: [usize; 3],

    /// Edge length of each cubic cell.
    pub cell_size: Length,
}

impl GridSpec {
    /// Creates a spec with the cell size given in meters.
    #[must_use]
    pub fn new(shape: [usize; 3], cell_size_m: f64) -> Self {
        Self {
            shape,
            cell_size: Length::new::<meter>(cell_size_m),
        }
    }

    pub(crate) fn validate(&self) -> Result<Constrained<Length, StrictlyPositive>, ConfigError> {
        for (axis, n) in ['x', 'y', 'z'].into_iter().zip(self.shape) {
            if n == 0 {
                return Err(ConfigError::GridDimension { axis });
            }
        }

        // The temperature field is the largest allocation.
        let addressable = self
            .shape
            .iter()
            .try_fold(size_of::<f64>(), |bytes, &n| bytes.checked_mul(n))
            .is_some_and(|bytes| isize::try_from(bytes).is_ok());
        if !addressable {
            return Err(ConfigError::GridTooLarge { shape: self.shape });
        }

        let cell_size = Constrained::new(self.cell_size).map_err(ConfigError::CellSize)?;
        if !self.cell_size.get::<meter>().is_finite() {
            return Err(ConfigError::InvalidOption {
                option: "cell_size",
                reason: "must be finite",
            });
        }

        Ok(cell_size)
    }
}

/// The voxelized workpiece: occupancy and temperature over a fixed index space.
///
/// Both fields share the same shape.
/// An unoccupied cell always sits at the ambient temperature, and occupancy
/// only ever goes from present to absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub(crate) occupied: Array3<bool>,
    pub(crate) temperature: Array3<f64>,
    pub(crate) occupied_count: usize,
    pub(crate) cell_size: f64,
    pub(crate) ambient: f64,
}

impl Grid {
    /// Creates a fully occupied grid at the ambient temperature.
    pub(crate) fn new(
        shape: [usize; 3],
        cell_size: Constrained<Length, StrictlyPositive>,
        ambient: ThermodynamicTemperature,
    ) -> Self {
        let [nx, ny, nz] = shape;
        let ambient = ambient.get::<kelvin>();
        Self {
            occupied: Array3::from_elem((nx, ny, nz), true),
            temperature: Array3::from_elem((nx, ny, nz), ambient),
            occupied_count: nx * ny * nz,
            cell_size: cell_size.into_inner().get::<meter>(),
            ambient,
        }
    }

    /// Returns the number of cells along x, y, and z.
    #[must_use]
    pub fn shape(&self) -> [usize; 3] {
        let (nx, ny, nz) = self.occupied.dim();
        [nx, ny, nz]
    }

    /// Returns the total number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    /// Returns `true` if the grid has no cells.
    ///
    /// Validated grids always have at least one cell.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    #[must_use]
    pub fn cell_size(&self) -> Length {
        Length::new::<meter>(self.cell_size)
    }

    #[must_use]
    pub fn cell_volume(&self) -> Volume {
        Volume::new::<cubic_meter>(self.cell_size.powi(3))
    }

    #[must_use]
    pub fn ambient(&self) -> ThermodynamicTemperature {
        ThermodynamicTemperature::new::<kelvin>(self.ambient)
    }

    /// Read-only view of the occupancy field.
    #[must_use]
    pub fn occupancy(&self) -> ArrayView3<'_, bool> {
        self.occupied.view()
    }

    /// Read-only view of the temperature field, in kelvin.
    #[must_use]
    pub fn temperatures(&self) -> ArrayView3<'_, f64> {
        self.temperature.view()
    }

    /// Returns `true` if the cell exists and still holds material.
    #[must_use]
    pub fn is_occupied(&self, voxel: Voxel) -> bool {
        self.occupied.get(voxel).copied().unwrap_or(false)
    }

    /// Returns the temperature of a cell, or `None` if it is out of bounds.
    #[must_use]
    pub fn temperature(&self, voxel: Voxel) -> Option<ThermodynamicTemperature> {
        self.temperature
            .get(voxel)
            .map(|&t| ThermodynamicTemperature::new::<kelvin>(t))
    }

    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.occupied_count
    }

    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.len() - self.occupied_count
    }

    /// Volume of material removed so far.
    #[must_use]
    pub fn removed_volume(&self) -> Volume {
        #[allow(clippy::cast_precision_loss)]
        let cells = self.removed_count() as f64;
        Volume::new::<cubic_meter>(cells * self.cell_size.powi(3))
    }

    /// Returns the highest temperature anywhere in the grid.
    #[must_use]
    pub fn max_temperature(&self) -> ThermodynamicTemperature {
        let max = self
            .temperature
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        ThermodynamicTemperature::new::<kelvin>(max)
    }

    /// Returns how many layers below the top face the deepest removed cell
    /// reaches, counting the top layer as one.
    ///
    /// Returns zero while nothing has been removed.
    #[must_use]
    pub fn removal_depth(&self) -> usize {
        let nz = self.shape()[2];
        self.occupied
            .indexed_iter()
            .filter(|&(_, &occupied)| !occupied)
            .map(|((_, _, k), _)| nz - k)
            .max()
            .unwrap_or(0)
    }

    /// Returns the depth of [`Grid::removal_depth`] as a length.
    #[must_use]
    pub fn removal_depth_length(&self) -> Length {
        #[allow(clippy::cast_precision_loss)]
        let layers = self.removal_depth() as f64;
        Length::new::<meter>(layers * self.cell_size)
    }
}

/// Integer position of the tool tip in grid coordinates.
///
/// The tool starts one layer above the top face, centred in x and y.
/// It may sit outside the grid, so coordinates are signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToolPosition {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl ToolPosition {
    /// Returns the starting position for a grid of the given shape.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn above(shape: [usize; 3]) -> Self {
        let [nx, ny, nz] = shape;
        Self {
            x: (nx / 2) as i64,
            y: (ny / 2) as i64,
            z: nz as i64,
        }
    }

    /// Moves the tool one cell deeper into the workpiece.
    pub fn advance_depth(&mut self) {
        self.z -= 1;
    }

    /// Squared Euclidean distance to a cell, in cells².
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn distance_squared(&self, voxel: Voxel) -> i64 {
        let [i, j, k] = voxel;
        let dx = i as i64 - self.x;
        let dy = j as i64 - self.y;
        let dz = k as i64 - self.z;
        dx * dx + dy * dy + dz * dz
    }
}
