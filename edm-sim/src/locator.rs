use crate::grid::{Grid, ToolPosition, Voxel};

/// Returns the occupied cell nearest to the tool tip.
///
/// Distance is Euclidean and compared exactly as an integer squared distance.
/// Ties go to the cell visited first in row-major order (`i`, then `j`,
/// then `k`).
/// Returns `None` when no cell is occupied.
#[must_use]
pub fn nearest_occupied(grid: &Grid, tool: ToolPosition) -> Option<Voxel> {
    if grid.occupied_count == 0 {
        return None;
    }

    let mut best: Option<(i64, Voxel)> = None;
    for ((i, j, k), &occupied) in grid.occupied.indexed_iter() {
        if !occupied {
            continue;
        }
        let voxel = [i, j, k];
        let distance = tool.distance_squared(voxel);
        if best.is_none_or(|(nearest, _)| distance < nearest) {
            best = Some((distance, voxel));
            if distance == 0 {
                break;
            }
        }
    }

    best.map(|(_, voxel)| voxel)
}
