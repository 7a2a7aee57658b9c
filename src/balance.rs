//! Balance derivation
//!
//! Reduces a calibrated (not resampled) pressure grid to left/right and
//! front/back imbalance. The display resolution never influences balance.

use crate::types::{BalanceReading, BalanceShares, BalanceVector, PressureGrid};

/// Derive balance from a calibrated grid.
///
/// Columns with `col < cols / 2` form the left half and rows with
/// `row < rows / 2` the front half, compared as real numbers, so on odd
/// extents the middle column/row counts toward left/front. Negative cells
/// contribute nothing. A grid with no pressure at all is treated as balanced.
pub fn derive_balance(grid: &PressureGrid) -> BalanceReading {
    let half_cols = grid.cols() as f64 / 2.0;
    let half_rows = grid.rows() as f64 / 2.0;

    let (mut left, mut right, mut front, mut back) = (0.0, 0.0, 0.0, 0.0);
    for r in 0..grid.rows() {
        for c in 0..grid.cols() {
            let v = grid.get(r, c).max(0.0);
            if (c as f64) < half_cols {
                left += v;
            } else {
                right += v;
            }
            if (r as f64) < half_rows {
                front += v;
            } else {
                back += v;
            }
        }
    }

    let total = left + right;
    if total <= 0.0 {
        return BalanceReading::default();
    }

    BalanceReading {
        vector: BalanceVector {
            lr: ((left - right).abs() / total).clamp(0.0, 1.0),
            fb: ((front - back).abs() / total).clamp(0.0, 1.0),
        },
        shares: BalanceShares {
            left: left / total,
            right: right / total,
            front: front / total,
            back: back / total,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid(rows: Vec<Vec<f64>>) -> PressureGrid {
        PressureGrid::from_rows(rows).unwrap()
    }

    #[test]
    fn test_all_left_column() {
        let reading = derive_balance(&grid(vec![vec![5.0, 0.0], vec![5.0, 0.0]]));
        assert_eq!(reading.vector.lr, 1.0);
        assert_eq!(reading.vector.fb, 0.0);
        assert_eq!(reading.shares.right_pct(), 0);
    }

    #[test]
    fn test_left_column_front_rows() {
        let reading = derive_balance(&grid(vec![
            vec![9.0, 0.0, 0.0],
            vec![9.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0],
        ]));
        assert_eq!(reading.vector.lr, 1.0);
        // Row 1 of 3 is still in front (1 < 1.5)
        assert_eq!(reading.vector.fb, 1.0);
    }

    #[test]
    fn test_odd_middle_column_counts_left() {
        // Column 1 of 3: 1 < 1.5
        let reading = derive_balance(&grid(vec![vec![0.0, 4.0, 0.0], vec![0.0, 4.0, 0.0]]));
        assert_eq!(reading.shares.left, 1.0);
        assert_eq!(reading.shares.right, 0.0);
        assert_eq!(reading.vector.lr, 1.0);
    }

    #[test]
    fn test_odd_middle_row_counts_front() {
        let reading = derive_balance(&grid(vec![
            vec![0.0, 0.0, 0.0],
            vec![6.0, 6.0, 6.0],
            vec![0.0, 0.0, 0.0],
        ]));
        assert_eq!(reading.shares.front, 1.0);
        assert_eq!(reading.shares.back_pct(), 0);
        assert_eq!(reading.vector.fb, 1.0);
    }

    #[test]
    fn test_uniform_grid_is_balanced() {
        let reading = derive_balance(&PressureGrid::filled(4, 6, 12.0).unwrap());
        assert_eq!(reading.vector, BalanceVector { lr: 0.0, fb: 0.0 });
        assert_eq!(reading.shares.right_pct(), 50);
        assert_eq!(reading.shares.back_pct(), 50);
    }

    #[test]
    fn test_zero_grid_falls_back_to_balanced() {
        let reading = derive_balance(&PressureGrid::filled(3, 3, 0.0).unwrap());
        assert_eq!(reading, BalanceReading::default());
    }

    #[test]
    fn test_negative_cells_ignored() {
        let reading = derive_balance(&grid(vec![vec![-50.0, 10.0], vec![-50.0, 10.0]]));
        assert_eq!(reading.vector.lr, 1.0);
        assert!(reading.shares.right > 0.99);
    }

    #[test]
    fn test_partial_imbalance() {
        // left 30, right 10, front 20, back 20
        let reading = derive_balance(&grid(vec![vec![15.0, 5.0], vec![15.0, 5.0]]));
        assert!((reading.vector.lr - 0.5).abs() < 1e-12);
        assert_eq!(reading.vector.fb, 0.0);
        assert_eq!(reading.shares.right_pct(), 25);
    }
}
