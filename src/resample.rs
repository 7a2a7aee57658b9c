//! Bilinear grid resampling
//!
//! Maps a pressure grid of any sensor resolution onto the display resolution.
//! This is a pure geometric remap: the corner samples of the output sit
//! exactly on the corner samples of the input, so edges are preserved.

use crate::types::PressureGrid;

/// Resample `grid` to `target_rows x target_cols` and return the cells row-major.
///
/// A target axis of length 1 samples the first source row/column instead of
/// dividing by zero. A zero-length axis yields an empty result.
pub fn bilinear(grid: &PressureGrid, target_rows: usize, target_cols: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(target_rows * target_cols);

    for i in 0..target_rows {
        let (y0, y1, fy) = source_coord(i, grid.rows(), target_rows);
        for j in 0..target_cols {
            let (x0, x1, fx) = source_coord(j, grid.cols(), target_cols);

            let top = lerp(grid.get(y0, x0), grid.get(y0, x1), fx);
            let bottom = lerp(grid.get(y1, x0), grid.get(y1, x1), fx);
            out.push(lerp(top, bottom, fy));
        }
    }

    out
}

/// Resample to a square grid of side `size`
pub fn resample_square(grid: &PressureGrid, size: usize) -> Vec<f64> {
    bilinear(grid, size, size)
}

/// Locate output index `i` on the source axis: the two neighbouring source
/// indices and the fractional weight of the second one.
fn source_coord(i: usize, source_len: usize, target_len: usize) -> (usize, usize, f64) {
    if target_len <= 1 || source_len <= 1 {
        return (0, 0, 0.0);
    }

    let pos = (i * (source_len - 1)) as f64 / (target_len - 1) as f64;
    let lo = (pos.floor() as usize).min(source_len - 1);
    let hi = (lo + 1).min(source_len - 1);
    (lo, hi, pos - lo as f64)
}

pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid(rows: Vec<Vec<f64>>) -> PressureGrid {
        PressureGrid::from_rows(rows).unwrap()
    }

    #[test]
    fn test_same_size_is_identity() {
        let g = grid(vec![
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        ]);
        assert_eq!(resample_square(&g, 3), g.values().to_vec());
    }

    #[test]
    fn test_upsample_midpoints() {
        let g = grid(vec![vec![0.0, 10.0], vec![20.0, 30.0]]);
        let out = resample_square(&g, 3);
        assert_eq!(
            out,
            vec![0.0, 5.0, 10.0, 10.0, 15.0, 20.0, 20.0, 25.0, 30.0]
        );
    }

    #[test]
    fn test_corners_preserved_on_downsample() {
        let g = grid(vec![
            vec![1.0, 0.0, 0.0, 2.0],
            vec![0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0],
            vec![3.0, 0.0, 0.0, 4.0],
        ]);
        let out = resample_square(&g, 2);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_constant_grid_stays_constant() {
        let g = PressureGrid::filled(5, 3, 42.0).unwrap();
        for size in [2, 7, 16] {
            let out = resample_square(&g, size);
            assert_eq!(out.len(), size * size);
            assert!(out.iter().all(|v| (*v - 42.0).abs() < 1e-9));
        }
    }

    #[test]
    fn test_single_target_axis_clamps() {
        let g = grid(vec![vec![7.0, 1.0], vec![2.0, 3.0]]);
        let out = bilinear(&g, 1, 1);
        assert_eq!(out, vec![7.0]);

        let out = bilinear(&g, 1, 3);
        assert_eq!(out, vec![7.0, 4.0, 1.0]);
    }

    #[test]
    fn test_non_square_source() {
        let g = grid(vec![vec![0.0, 10.0, 20.0, 30.0], vec![0.0, 10.0, 20.0, 30.0]]);
        let out = resample_square(&g, 2);
        assert_eq!(out, vec![0.0, 30.0, 0.0, 30.0]);
    }
}
