//! Pure cost and utility evaluation

use crate::game::types::AllocationVector;

/// Per-resource completion time under an allocation: the base time where a
/// subtask is placed, zero elsewhere.
pub fn time_vector(alloc: &AllocationVector, base_times: &[f64]) -> Vec<f64> {
    debug_assert_eq!(alloc.len(), base_times.len());
    base_times
        .iter()
        .enumerate()
        .map(|(j, &t)| if alloc.is_assigned(j) { t } else { 0.0 })
        .collect()
}

/// Per-resource expense under an allocation: time times price where a
/// subtask is placed. Expense is never scaled by contention; only time is.
pub fn expense_vector(alloc: &AllocationVector, base_times: &[f64], prices: &[f64]) -> Vec<f64> {
    debug_assert_eq!(alloc.len(), base_times.len());
    debug_assert_eq!(alloc.len(), prices.len());
    (0..alloc.len())
        .map(|j| {
            if alloc.is_assigned(j) {
                base_times[j] * prices[j]
            } else {
                0.0
            }
        })
        .collect()
}

/// Completion time of a task is the slowest of its occupied resources
pub fn max_time(times: &[f64]) -> f64 {
    times.iter().copied().fold(0.0, f64::max)
}

pub fn total_expense(expenses: &[f64]) -> f64 {
    expenses.iter().sum()
}

fn weighted_inverse_cost(max_t: f64, total_e: f64, weight_time: f64, weight_expense: f64) -> f64 {
    let denominator = weight_time * max_t + weight_expense * total_e;
    if denominator == 0.0 {
        return 0.0;
    }
    1.0 / denominator
}

/// Utility of an allocation against a supplied execution-time vector:
/// `1 / (wt * max(time) + we * sum(expense))`, defined as 0 when the
/// weighted cost is exactly zero.
pub fn utility(
    alloc: &AllocationVector,
    base_times: &[f64],
    prices: &[f64],
    weight_time: f64,
    weight_expense: f64,
) -> f64 {
    let times = time_vector(alloc, base_times);
    let expenses = expense_vector(alloc, base_times, prices);
    weighted_inverse_cost(
        max_time(&times),
        total_expense(&expenses),
        weight_time,
        weight_expense,
    )
}

/// Same formula applied to coordinator-supplied actual vectors, where time
/// already carries the contention factor.
pub fn actual_utility(
    actual_times: &[f64],
    actual_expenses: &[f64],
    weight_time: f64,
    weight_expense: f64,
) -> f64 {
    weighted_inverse_cost(
        max_time(actual_times),
        total_expense(actual_expenses),
        weight_time,
        weight_expense,
    )
}

/// Whether an allocation meets both the deadline and the budget, evaluated
/// against the supplied execution times. Equality passes.
pub fn check_constraints(
    alloc: &AllocationVector,
    base_times: &[f64],
    prices: &[f64],
    deadline: f64,
    budget: f64,
) -> bool {
    let times = time_vector(alloc, base_times);
    let expenses = expense_vector(alloc, base_times, prices);
    max_time(&times) <= deadline && total_expense(&expenses) <= budget
}
