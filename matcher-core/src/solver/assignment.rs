//! Exact minimum-cost perfect assignment on a square integer matrix.
//!
//! Hungarian algorithm in the potentials formulation, O(n^3). Both solver
//! modes reduce to this kernel: strict mode prices disallowed pairs at
//! [`FORBIDDEN`] and checks the optimum afterwards, exception mode folds
//! penalties into the costs. The kernel is deterministic: equal-cost optima
//! resolve by index order, so repeated runs over the same matrix agree.

use std::time::Instant;

/// Cost sentinel for pairs the caller wants excluded. Large enough that a
/// single sentinel edge outweighs any achievable all-allowed total, small
/// enough that potential sums stay far from `i64` overflow.
pub const FORBIDDEN: i64 = 1 << 40;

/// The deadline elapsed before an optimum was proven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded;

/// Solves the n x n min-cost perfect assignment.
///
/// Returns `assignment` with `assignment[row] = column`. The deadline is
/// polled once per augmented row; on expiry the partial state is discarded.
pub fn solve_min_cost(
    cost: &[Vec<i64>],
    deadline: Option<Instant>,
) -> Result<Vec<usize>, DeadlineExceeded> {
    let n = cost.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    debug_assert!(cost.iter().all(|row| row.len() == n));

    // Potentials u (rows) and v (columns), 1-indexed; p[j] is the row
    // currently matched to column j, 0 meaning unmatched.
    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; n + 1];
    let mut p = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(DeadlineExceeded);
            }
        }

        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![i64::MAX; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = i64::MAX;
            let mut j1 = 0usize;
            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let cur = cost[i0 - 1][j - 1] - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        // Walk the alternating path back, flipping assignments.
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0usize; n];
    for j in 1..=n {
        assignment[p[j] - 1] = j - 1;
    }
    Ok(assignment)
}
