//! Derivation of round-2 planning times from round-1 outcomes

use crate::error::{Error, Result};

/// Congestion-forecast execution times for the next round:
/// `new[i][j] = base[i][j] + mean over tasks of actual[:, j]`.
///
/// The result is optimizer input only. Settlement of the next round must
/// run against the original base matrix; collapsing the two would change
/// the game.
pub fn next_round_times(
    actual_times: &[Vec<f64>],
    base_times: &[Vec<f64>],
) -> Result<Vec<Vec<f64>>> {
    let n = base_times.len();
    if actual_times.len() != n {
        return Err(Error::ShapeMismatch {
            expected: n,
            actual: actual_times.len(),
        });
    }
    if n == 0 {
        return Err(Error::State("no tasks to update".into()));
    }
    let m = base_times[0].len();
    for row in base_times.iter().chain(actual_times) {
        if row.len() != m {
            return Err(Error::ShapeMismatch {
                expected: m,
                actual: row.len(),
            });
        }
    }

    let column_means: Vec<f64> = (0..m)
        .map(|j| actual_times.iter().map(|row| row[j]).sum::<f64>() / n as f64)
        .collect();

    Ok(base_times
        .iter()
        .map(|row| {
            row.iter()
                .zip(&column_means)
                .map(|(&base, &mean)| base + mean)
                .collect()
        })
        .collect())
}
