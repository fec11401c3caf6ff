//! Structured logging helpers for game state

use crate::game::coordinator::{MultiplexingReport, Settlement};
use crate::game::types::{AllocationMatrix, TaskId};

#[macro_export]
macro_rules! game_info {
    ($($arg:tt)+) => {
        tracing::info!(target: "game", $($arg)+)
    }
}

#[macro_export]
macro_rules! game_debug {
    ($($arg:tt)+) => {
        tracing::debug!(target: "game", $($arg)+)
    }
}

/// Log a numeric matrix row by row, one line per task
pub fn log_matrix(name: &str, task_ids: &[TaskId], matrix: &[Vec<f64>]) {
    game_info!("{}:", name);
    for (id, row) in task_ids.iter().zip(matrix) {
        let cells = row
            .iter()
            .map(|v| format!("{v:.2}"))
            .collect::<Vec<_>>()
            .join(", ");
        game_info!("  {}: [{}]", id, cells);
    }
}

pub fn log_allocation_matrix(matrix: &AllocationMatrix) {
    game_info!("Allocation matrix:");
    for (id, row) in matrix.task_ids().iter().zip(matrix.rows()) {
        game_info!("  {}: {}", id, row);
    }
}

/// Log a full settlement: both matrices plus the per-task summaries
pub fn log_settlement(settlement: &Settlement) {
    game_info!("Round {} settled", settlement.round);
    log_allocation_matrix(&settlement.allocations);
    log_matrix(
        "Actual execution time matrix",
        settlement.allocations.task_ids(),
        &settlement.time_matrix,
    );
    log_matrix(
        "Expense matrix",
        settlement.allocations.task_ids(),
        &settlement.expense_matrix,
    );
    for task in &settlement.tasks {
        game_info!(
            "  {}: max time {:.2}s, total expense {:.2}",
            task.task_id,
            task.max_time,
            task.total_expense
        );
    }
}

pub fn log_multiplexing(report: &MultiplexingReport) {
    if report.is_empty() {
        game_info!("No resource multiplexing");
        return;
    }
    game_info!("Multiplexed resources:");
    for (resource, shared) in report.iter() {
        let tasks = shared
            .task_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        game_info!("  R{}: {} tasks ({})", resource + 1, shared.count, tasks);
    }
}
