//! Minimum-cost one-to-one assignment (Hungarian algorithm).
//!
//! Used by the optimal matching strategy. Entries that are not finite mark
//! pairs that may never be assigned.

use ndarray::ArrayView2;

/// Solves the rectangular assignment problem for `cost` (rows x columns).
///
/// Returns, for every row, the column assigned to it. The number of allowed
/// pairs is maximised first; among those solutions the total cost is minimal.
pub fn min_cost_assignment(cost: ArrayView2<f64>) -> Vec<Option<usize>> {
    let (rows, cols) = cost.dim();
    if rows == 0 || cols == 0 {
        return vec![None; rows];
    }

    let n = rows.max(cols);
    let largest = cost
        .iter()
        .filter(|value| value.is_finite())
        .fold(0.0_f64, |acc, &value| acc.max(value.abs()));
    // Larger than any sum of allowed costs, so an extra allowed pair always wins.
    let forbidden = (largest + 1.0) * (n as f64 + 1.0);
    let entry = |row: usize, col: usize| -> f64 {
        if row < rows && col < cols && cost[[row, col]].is_finite() {
            cost[[row, col]]
        } else {
            forbidden
        }
    };

    // Potentials and matching are 1-based; index 0 is the virtual root.
    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; n + 1];
    let mut owner = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        owner[0] = row;
        let mut col0 = 0usize;
        let mut min_slack = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[col0] = true;
            let row0 = owner[col0];
            let mut delta = f64::INFINITY;
            let mut col1 = 0usize;

            for col in 1..=n {
                if used[col] {
                    continue;
                }
                let slack = entry(row0 - 1, col - 1) - u[row0] - v[col];
                if slack < min_slack[col] {
                    min_slack[col] = slack;
                    way[col] = col0;
                }
                if min_slack[col] < delta {
                    delta = min_slack[col];
                    col1 = col;
                }
            }

            for col in 0..=n {
                if used[col] {
                    u[owner[col]] += delta;
                    v[col] -= delta;
                } else {
                    min_slack[col] -= delta;
                }
            }

            col0 = col1;
            if owner[col0] == 0 {
                break;
            }
        }

        loop {
            let prev = way[col0];
            owner[col0] = owner[prev];
            col0 = prev;
            if col0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![None; rows];
    for col in 1..=n {
        let row = owner[col];
        if row == 0 {
            continue;
        }
        let (r, c) = (row - 1, col - 1);
        if r < rows && c < cols && cost[[r, c]].is_finite() {
            assignment[r] = Some(c);
        }
    }
    assignment
}
