//! Multiplexing-aware settlement of submitted allocations

use crate::config::Scenario;
use crate::error::{Error, Result};
use crate::game::barrier::SubmissionBarrier;
use crate::game::logging::{log_multiplexing, log_settlement};
use crate::game::round::next_round_times;
use crate::game::types::{AllocationMatrix, AllocationVector, TaskId};
use crate::game::utility::{max_time, total_expense};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Progress of the two-round game; exactly two rounds, no loop back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    Round1AwaitingAll,
    Round1Settled,
    Round2AwaitingAll,
    Round2Settled,
}

impl RoundPhase {
    /// The round the phase belongs to
    pub fn round(self) -> u8 {
        match self {
            Self::Round1AwaitingAll | Self::Round1Settled => 1,
            Self::Round2AwaitingAll | Self::Round2Settled => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Round2Settled
    }
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Round1AwaitingAll => "round 1 awaiting submissions",
            Self::Round1Settled => "round 1 settled",
            Self::Round2AwaitingAll => "round 2 awaiting submissions",
            Self::Round2Settled => "round 2 settled",
        };
        write!(f, "{name}")
    }
}

/// One task's contention-resolved outcome within a settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSettlement {
    pub task_id: TaskId,
    /// Actual per-resource times, each scaled by its contention factor
    pub time_vector: Vec<f64>,
    /// Actual per-resource expenses, unaffected by contention
    pub expense_vector: Vec<f64>,
    pub max_time: f64,
    pub total_expense: f64,
}

/// Immutable snapshot of one round's settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub round: u8,
    pub allocations: AllocationMatrix,
    pub time_matrix: Vec<Vec<f64>>,
    pub expense_matrix: Vec<Vec<f64>>,
    /// Per-task summaries in canonical order
    pub tasks: Vec<TaskSettlement>,
}

impl Settlement {
    pub fn task(&self, id: TaskId) -> Option<&TaskSettlement> {
        self.tasks.iter().find(|t| t.task_id == id)
    }
}

/// Which tasks share a resource this round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedResource {
    pub count: usize,
    pub task_ids: Vec<TaskId>,
}

/// Resource column index to sharing info, for resources with contention > 1
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MultiplexingReport(BTreeMap<usize, SharedResource>);

impl MultiplexingReport {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, resource: usize) -> Option<&SharedResource> {
        self.0.get(&resource)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &SharedResource)> {
        self.0.iter().map(|(&j, shared)| (j, shared))
    }
}

/// Settles each round's submitted allocations into actual cost matrices
///
/// Holds the shared price vector and every task's base execution times.
/// Settlement always uses these original base times; the adjusted times a
/// coordinator hands out for round-2 planning never feed back into
/// settlement.
#[derive(Debug, Clone)]
pub struct Coordinator {
    task_ids: Vec<TaskId>,
    base_times: Vec<Vec<f64>>,
    prices: Vec<f64>,
    phase: RoundPhase,
    history: Vec<Settlement>,
}

impl Coordinator {
    pub fn new(scenario: &Scenario) -> Self {
        Self {
            task_ids: scenario.task_ids(),
            base_times: scenario.base_time_matrix(),
            prices: scenario.prices.clone(),
            phase: RoundPhase::Round1AwaitingAll,
            history: Vec::new(),
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn task_ids(&self) -> &[TaskId] {
        &self.task_ids
    }

    /// All settlements so far, oldest first. Snapshots are never mutated.
    pub fn history(&self) -> &[Settlement] {
        &self.history
    }

    pub fn latest(&self) -> Option<&Settlement> {
        self.history.last()
    }

    /// A fresh rendezvous for the current round's submissions
    pub fn barrier(&self) -> SubmissionBarrier {
        SubmissionBarrier::new(self.task_ids.clone())
    }

    /// Settle the current round from one allocation vector per known task
    ///
    /// Fails on any arity mismatch: a missing task, an unknown task, or a
    /// vector of the wrong length. A round is never partially settled.
    pub fn process(
        &mut self,
        allocations: HashMap<TaskId, AllocationVector>,
    ) -> Result<&Settlement> {
        match self.phase {
            RoundPhase::Round1AwaitingAll | RoundPhase::Round2AwaitingAll => {}
            phase => {
                return Err(Error::State(format!(
                    "cannot settle while {phase}"
                )));
            }
        }

        let matrix = self.build_matrix(allocations)?;
        let round = self.phase.round();

        let n = matrix.num_tasks();
        let m = matrix.width();
        let contention: Vec<usize> = (0..m).map(|j| matrix.contention(j)).collect();

        let mut time_matrix = Vec::with_capacity(n);
        let mut expense_matrix = Vec::with_capacity(n);
        for i in 0..n {
            let row = matrix.row(i);
            let mut times = Vec::with_capacity(m);
            let mut expenses = Vec::with_capacity(m);
            for j in 0..m {
                if row.is_assigned(j) {
                    times.push(contention[j] as f64 * self.base_times[i][j]);
                    expenses.push(self.base_times[i][j] * self.prices[j]);
                } else {
                    times.push(0.0);
                    expenses.push(0.0);
                }
            }
            time_matrix.push(times);
            expense_matrix.push(expenses);
        }

        let tasks = self
            .task_ids
            .iter()
            .enumerate()
            .map(|(i, &task_id)| TaskSettlement {
                task_id,
                time_vector: time_matrix[i].clone(),
                expense_vector: expense_matrix[i].clone(),
                max_time: max_time(&time_matrix[i]),
                total_expense: total_expense(&expense_matrix[i]),
            })
            .collect();

        let settlement = Settlement {
            round,
            allocations: matrix,
            time_matrix,
            expense_matrix,
            tasks,
        };
        log_settlement(&settlement);
        log_multiplexing(&Self::report_multiplexing(&settlement.allocations));

        self.phase = match self.phase {
            RoundPhase::Round1AwaitingAll => RoundPhase::Round1Settled,
            _ => RoundPhase::Round2Settled,
        };
        self.history.push(settlement);
        self.history
            .last()
            .ok_or_else(|| Error::State("settlement history empty".into()))
    }

    /// Derive round-2 planning times from the round-1 settlement and open
    /// round 2 for submissions
    ///
    /// The returned matrix is optimizer input only; round-2 settlement
    /// still runs against the original base times.
    pub fn begin_round2(&mut self) -> Result<Vec<Vec<f64>>> {
        if self.phase != RoundPhase::Round1Settled {
            return Err(Error::State(format!(
                "cannot begin round 2 while {}",
                self.phase
            )));
        }
        let settled = self
            .history
            .last()
            .ok_or_else(|| Error::State("round 1 settlement missing".into()))?;
        let forecast = next_round_times(&settled.time_matrix, &self.base_times)?;
        self.phase = RoundPhase::Round2AwaitingAll;
        Ok(forecast)
    }

    /// Which resources are shared this round, and by whom
    ///
    /// Resources with contention 0 or 1 are omitted. Pure and idempotent.
    pub fn report_multiplexing(matrix: &AllocationMatrix) -> MultiplexingReport {
        let mut shared = BTreeMap::new();
        for j in 0..matrix.width() {
            let count = matrix.contention(j);
            if count > 1 {
                let task_ids = matrix
                    .task_ids()
                    .iter()
                    .zip(matrix.rows())
                    .filter(|(_, row)| row.is_assigned(j))
                    .map(|(&id, _)| id)
                    .collect();
                shared.insert(j, SharedResource { count, task_ids });
            }
        }
        MultiplexingReport(shared)
    }

    fn build_matrix(
        &self,
        mut allocations: HashMap<TaskId, AllocationVector>,
    ) -> Result<AllocationMatrix> {
        for &id in allocations.keys() {
            if !self.task_ids.contains(&id) {
                return Err(Error::UnexpectedSubmission(id));
            }
        }

        let m = self.prices.len();
        let mut rows = Vec::with_capacity(self.task_ids.len());
        for &id in &self.task_ids {
            let row = allocations
                .remove(&id)
                .ok_or(Error::IncompleteSubmission(id))?;
            if row.len() != m {
                return Err(Error::ShapeMismatch {
                    expected: m,
                    actual: row.len(),
                });
            }
            rows.push(row);
        }
        AllocationMatrix::new(self.task_ids.clone(), rows)
    }
}
