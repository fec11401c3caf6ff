use crate::config::Scenario;
use crate::error::{Error, Result};
use crate::game::coordinator::{MultiplexingReport, Settlement};
use crate::game::optimizer::OptimizeOutcome;
use crate::game::types::{AllocationVector, TaskId};
use crate::game::utility::actual_utility;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// One task's outcome for one round, expected versus settled
#[derive(Debug, Clone, Serialize)]
pub struct TaskRoundOutcome {
    pub task_id: TaskId,
    pub allocation: AllocationVector,
    pub expected_utility: f64,
    pub actual_utility: f64,
    /// Expected minus actual; positive when contention hurt the task
    pub utility_loss: f64,
    pub feasible: bool,
    pub max_time: f64,
    pub total_expense: f64,
    pub within_deadline: bool,
    pub within_budget: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundLog {
    pub round: u8,
    pub outcomes: Vec<TaskRoundOutcome>,
    pub shared_resources: MultiplexingReport,
    pub total_expected_utility: f64,
    pub total_actual_utility: f64,
}

/// Per-task change in settled utility between the two rounds
#[derive(Debug, Clone, Serialize)]
pub struct TaskImprovement {
    pub task_id: TaskId,
    pub round1_actual: f64,
    pub round2_actual: f64,
    pub improvement: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameReport {
    pub rounds: Vec<RoundLog>,
    pub improvements: Vec<TaskImprovement>,
    pub total_improvement: f64,
}

impl GameReport {
    pub fn round(&self, round: u8) -> Option<&RoundLog> {
        self.rounds.iter().find(|r| r.round == round)
    }
}

pub(crate) fn build_round_log(
    scenario: &Scenario,
    outcomes: &HashMap<TaskId, OptimizeOutcome>,
    settlement: &Settlement,
    shared_resources: MultiplexingReport,
) -> Result<RoundLog> {
    let mut logs = Vec::with_capacity(scenario.num_tasks());
    for spec in &scenario.tasks {
        let id = spec.id;
        let outcome = outcomes
            .get(&id)
            .ok_or(Error::IncompleteSubmission(id))?;
        let settled = settlement
            .task(id)
            .ok_or(Error::IncompleteSubmission(id))?;
        let actual = actual_utility(
            &settled.time_vector,
            &settled.expense_vector,
            spec.weight_time,
            spec.weight_expense,
        );
        logs.push(TaskRoundOutcome {
            task_id: id,
            allocation: outcome.allocation.clone(),
            expected_utility: outcome.expected_utility,
            actual_utility: actual,
            utility_loss: outcome.expected_utility - actual,
            feasible: outcome.feasible,
            max_time: settled.max_time,
            total_expense: settled.total_expense,
            within_deadline: settled.max_time <= spec.deadline,
            within_budget: settled.total_expense <= spec.budget,
        });
    }

    let total_expected_utility = logs.iter().map(|o| o.expected_utility).sum();
    let total_actual_utility = logs.iter().map(|o| o.actual_utility).sum();
    Ok(RoundLog {
        round: settlement.round,
        outcomes: logs,
        shared_resources,
        total_expected_utility,
        total_actual_utility,
    })
}

pub(crate) fn build_report(round1: RoundLog, round2: RoundLog) -> GameReport {
    let improvements: Vec<TaskImprovement> = round1
        .outcomes
        .iter()
        .zip(&round2.outcomes)
        .map(|(r1, r2)| TaskImprovement {
            task_id: r1.task_id,
            round1_actual: r1.actual_utility,
            round2_actual: r2.actual_utility,
            improvement: r2.actual_utility - r1.actual_utility,
        })
        .collect();
    let total_improvement = improvements.iter().map(|i| i.improvement).sum();

    GameReport {
        rounds: vec![round1, round2],
        improvements,
        total_improvement,
    }
}

pub fn write_report_json<P: AsRef<Path>>(
    report: &GameReport,
    result_dir: P,
) -> std::io::Result<PathBuf> {
    let summary_path = result_dir.as_ref().join("summary.json");
    let mut summary_file = File::create(&summary_path)?;
    serde_json::to_writer_pretty(&mut summary_file, report)?;
    Ok(summary_path)
}
