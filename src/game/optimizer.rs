//! Per-task constrained brute-force optimizer

use crate::error::{Error, Result};
use crate::game::generator;
use crate::game::types::{AllocationVector, TaskId, TaskSpec};
use crate::game::utility::{check_constraints, utility};
use crate::game_debug;
use serde::{Deserialize, Serialize};

/// Result of one optimization pass for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeOutcome {
    pub task_id: TaskId,
    pub allocation: AllocationVector,
    /// Utility computed from the optimizer's own input times, before any
    /// contention adjustment
    pub expected_utility: f64,
    /// False when no candidate met the constraints and the first candidate
    /// was returned as-is
    pub feasible: bool,
    pub feasible_count: usize,
    pub candidate_count: usize,
}

/// Optimizer for a single task
///
/// Searches every candidate allocation for the feasible one with the
/// greatest utility. The search is a pure function of the task's own
/// configuration plus the supplied execution times; it knows nothing about
/// other tasks, so feasibility and utility are contention-naive.
#[derive(Debug, Clone)]
pub struct Optimizer {
    pub spec: TaskSpec,
    pub prices: Vec<f64>,
}

impl Optimizer {
    pub fn new(spec: TaskSpec, prices: &[f64]) -> Result<Self> {
        if spec.base_times.len() != prices.len() {
            return Err(Error::ShapeMismatch {
                expected: prices.len(),
                actual: spec.base_times.len(),
            });
        }
        Ok(Self {
            spec,
            prices: prices.to_vec(),
        })
    }

    pub fn task_id(&self) -> TaskId {
        self.spec.id
    }

    /// Optimize against the task's own base execution times (round 1)
    pub fn optimize_base(&self) -> Result<OptimizeOutcome> {
        self.optimize(&self.spec.base_times)
    }

    /// Select the feasible allocation with the greatest utility
    ///
    /// Candidates are visited in generator order and a candidate must be
    /// strictly better to displace the current best, so ties keep the
    /// first-encountered vector. When no candidate satisfies the
    /// constraints, the first candidate is returned with its utility and
    /// `feasible` is false; constraint violations are the caller's to
    /// inspect, not an error.
    pub fn optimize(&self, execution_times: &[f64]) -> Result<OptimizeOutcome> {
        if execution_times.len() != self.prices.len() {
            return Err(Error::ShapeMismatch {
                expected: self.prices.len(),
                actual: execution_times.len(),
            });
        }

        let spec = &self.spec;
        let candidates = generator::generate(spec.subtasks, execution_times.len())?;
        let candidate_count = candidates.len();
        game_debug!(
            "{} evaluating {} candidate allocations",
            spec.id,
            candidate_count
        );

        let mut best: Option<AllocationVector> = None;
        let mut best_utility = 0.0;
        let mut feasible_count = 0;

        for candidate in &candidates {
            if !check_constraints(
                candidate,
                execution_times,
                &self.prices,
                spec.deadline,
                spec.budget,
            ) {
                continue;
            }
            feasible_count += 1;

            let u = utility(
                candidate,
                execution_times,
                &self.prices,
                spec.weight_time,
                spec.weight_expense,
            );
            if u > best_utility {
                best_utility = u;
                best = Some(candidate.clone());
            }
        }

        let feasible = best.is_some();
        let (allocation, expected_utility) = match best {
            Some(allocation) => (allocation, best_utility),
            None => {
                // degraded result, not an error: fall back to the first
                // candidate and leave the constraints violated
                let first = candidates
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::State("no candidate allocations".into()))?;
                let u = utility(
                    &first,
                    execution_times,
                    &self.prices,
                    spec.weight_time,
                    spec.weight_expense,
                );
                (first, u)
            }
        };

        game_debug!(
            "{} picked {} utility {:.4} ({} of {} feasible)",
            spec.id,
            allocation,
            expected_utility,
            feasible_count,
            candidate_count
        );

        Ok(OptimizeOutcome {
            task_id: spec.id,
            allocation,
            expected_utility,
            feasible,
            feasible_count,
            candidate_count,
        })
    }
}
