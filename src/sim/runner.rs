//! Two-round game driver

use crate::config::Scenario;
use crate::error::Result;
use crate::game::coordinator::{Coordinator, MultiplexingReport, Settlement};
use crate::game::optimizer::{OptimizeOutcome, Optimizer};
use crate::game::types::TaskId;
use crate::game_info;
use crate::sim::report::{GameReport, build_report, build_round_log};
use std::collections::HashMap;

/// Run the full game: independent round-1 optimization, contention-aware
/// settlement, forecast derivation, round-2 re-optimization, and a second
/// settlement against the original base times.
pub fn run_two_round_game(scenario: &Scenario) -> Result<GameReport> {
    let optimizers: Vec<Optimizer> = scenario
        .tasks
        .iter()
        .map(|spec| Optimizer::new(spec.clone(), &scenario.prices))
        .collect::<Result<_>>()?;
    let mut coordinator = Coordinator::new(scenario);

    game_info!(
        "starting game: {} tasks, {} resources",
        scenario.num_tasks(),
        scenario.num_resources()
    );

    // Round 1: every task plans against its own base times.
    let mut outcomes1 = HashMap::new();
    for optimizer in &optimizers {
        let outcome = optimizer.optimize_base()?;
        game_info!(
            "{} round 1: {} expected utility {:.4}",
            outcome.task_id,
            outcome.allocation,
            outcome.expected_utility
        );
        outcomes1.insert(outcome.task_id, outcome);
    }
    let (settlement1, shared1) = settle(&mut coordinator, &outcomes1)?;
    let round1 = build_round_log(scenario, &outcomes1, &settlement1, shared1)?;

    // Round 2: plan against the congestion forecast, settle against the
    // original base times.
    let forecast = coordinator.begin_round2()?;
    let mut outcomes2 = HashMap::new();
    for (optimizer, times) in optimizers.iter().zip(&forecast) {
        let outcome = optimizer.optimize(times)?;
        game_info!(
            "{} round 2: {} expected utility {:.4}",
            outcome.task_id,
            outcome.allocation,
            outcome.expected_utility
        );
        outcomes2.insert(outcome.task_id, outcome);
    }
    let (settlement2, shared2) = settle(&mut coordinator, &outcomes2)?;
    let round2 = build_round_log(scenario, &outcomes2, &settlement2, shared2)?;

    let report = build_report(round1, round2);
    for improvement in &report.improvements {
        game_info!(
            "{}: settled utility {:.4} -> {:.4} ({:+.4})",
            improvement.task_id,
            improvement.round1_actual,
            improvement.round2_actual,
            improvement.improvement
        );
    }
    Ok(report)
}

/// Funnel one round's outcomes through the submission barrier and settle
fn settle(
    coordinator: &mut Coordinator,
    outcomes: &HashMap<TaskId, OptimizeOutcome>,
) -> Result<(Settlement, MultiplexingReport)> {
    let barrier = coordinator.barrier();
    for outcome in outcomes.values() {
        barrier.submit(outcome.task_id, outcome.allocation.clone())?;
    }
    let submissions = barrier.take()?;
    let settlement = coordinator.process(submissions)?.clone();
    let shared = Coordinator::report_multiplexing(&settlement.allocations);
    Ok((settlement, shared))
}
