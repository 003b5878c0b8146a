//! Fixed anisotropic spatial grid used to bucket sectors.
//!
//! The boundary tables are finer near the populated core of the catalog and
//! coarser at the edges. The vertical (y) axis is not gridded.

/// Boundary table for the z axis, in kilo-unit buckets after offsetting.
const GRID_Z: [i32; 25] = [
    0, 2, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 15, 17, 19, 24, 29, 34, 39, 44, 49, 54, 59, 64, 69,
];

/// Boundary table for the x axis.
const GRID_X: [i32; 19] = [
    0, 4, 9, 11, 13, 15, 16, 17, 18, 19, 20, 21, 22, 23, 25, 27, 29, 34, 39,
];

const X_OFFSET: i32 = 19500;
const Z_OFFSET: i32 = 9500;

/// Cell index of one fixed-point coordinate along one axis: recenter into
/// kilo-unit buckets, then binary-search the boundary table. An exact hit is
/// 1-based; a miss maps to the insertion point.
fn axis_cell(table: &[i32], fixed: i32, offset: i32) -> i32 {
    let bucket = ((fixed / 128 + offset) as f64 / 1000.0).floor() as i32;
    match table.binary_search(&bucket) {
        Ok(i) => i as i32 + 1,
        Err(i) => i as i32,
    }
}

/// Grid cell for a fixed-point position. Pure: equal inputs always produce
/// the same id.
pub fn grid_assign(x: i32, z: i32) -> i32 {
    axis_cell(&GRID_Z, z, Z_OFFSET) * 100 + axis_cell(&GRID_X, x, X_OFFSET)
}

#[cfg(test)]
mod tests {
    use super::grid_assign;

    #[test]
    fn origin_lands_in_core_cell() {
        assert_eq!(grid_assign(0, 0), 810);
    }

    #[test]
    fn assignment_is_deterministic() {
        let a = grid_assign(12345 * 128, -6789 * 128);
        let b = grid_assign(12345 * 128, -6789 * 128);
        assert_eq!(a, b);
    }

    #[test]
    fn far_negative_coordinates_fall_below_the_table() {
        // x below the first boundary maps to axis cell 0.
        let grid = grid_assign(-30000 * 128, 0);
        assert_eq!(grid % 100, 0);
        assert_eq!(grid / 100, 8);
    }

    #[test]
    fn distinct_cells_for_distant_positions() {
        assert_ne!(grid_assign(0, 0), grid_assign(0, 22000 * 128));
    }
}
