//! Walkthrough of the two-round allocation game on the reference scenario

use muxalloc::game::utility::actual_utility;
use muxalloc::{Coordinator, Optimizer, Scenario, write_report_json};

fn main() -> anyhow::Result<()> {
    println!("Two-Round Resource Allocation Game");
    println!("==================================");

    let scenario = Scenario::reference();
    let optimizers: Vec<Optimizer> = scenario
        .tasks
        .iter()
        .map(|spec| Optimizer::new(spec.clone(), &scenario.prices))
        .collect::<Result<_, _>>()?;
    let mut coordinator = Coordinator::new(&scenario);

    println!(
        "\n{} tasks compete for {} resources priced {:?}",
        scenario.num_tasks(),
        scenario.num_resources(),
        scenario.prices
    );

    // Round 1: every task plans in isolation.
    println!("\nRound 1: independent optimization");
    let barrier = coordinator.barrier();
    let mut round1_outcomes = Vec::new();
    for optimizer in &optimizers {
        let outcome = optimizer.optimize_base()?;
        println!(
            "  {} picks {} (expected utility {:.4}, {}/{} candidates feasible)",
            outcome.task_id,
            outcome.allocation,
            outcome.expected_utility,
            outcome.feasible_count,
            outcome.candidate_count
        );
        barrier.submit(outcome.task_id, outcome.allocation.clone())?;
        round1_outcomes.push(outcome);
    }

    let settlement1 = coordinator.process(barrier.take()?)?.clone();
    let shared = Coordinator::report_multiplexing(&settlement1.allocations);
    println!("\nSettlement with multiplexing:");
    for (resource, info) in shared.iter() {
        println!(
            "  R{} shared by {} tasks: {:?}",
            resource + 1,
            info.count,
            info.task_ids
        );
    }
    for outcome in &round1_outcomes {
        let settled = settlement1
            .task(outcome.task_id)
            .expect("settled every task");
        let spec = scenario.spec(outcome.task_id).expect("known task");
        let actual = actual_utility(
            &settled.time_vector,
            &settled.expense_vector,
            spec.weight_time,
            spec.weight_expense,
        );
        println!(
            "  {}: max time {:.2}s, expense {:.2}, settled utility {:.4} (loss {:.4})",
            outcome.task_id,
            settled.max_time,
            settled.total_expense,
            actual,
            outcome.expected_utility - actual
        );
    }

    // Round 2: re-plan against the congestion forecast; settlement still
    // uses the original base times.
    println!("\nRound 2: re-optimization with congestion forecast");
    let forecast = coordinator.begin_round2()?;
    let barrier = coordinator.barrier();
    for (optimizer, times) in optimizers.iter().zip(&forecast) {
        let outcome = optimizer.optimize(times)?;
        println!(
            "  {} now picks {} (expected utility {:.4})",
            outcome.task_id, outcome.allocation, outcome.expected_utility
        );
        barrier.submit(outcome.task_id, outcome.allocation)?;
    }
    let settlement2 = coordinator.process(barrier.take()?)?.clone();
    println!("\nFinal settled utilities:");
    for spec in &scenario.tasks {
        let r1 = settlement1.task(spec.id).expect("settled every task");
        let r2 = settlement2.task(spec.id).expect("settled every task");
        let u1 = actual_utility(&r1.time_vector, &r1.expense_vector, spec.weight_time, spec.weight_expense);
        let u2 = actual_utility(&r2.time_vector, &r2.expense_vector, spec.weight_time, spec.weight_expense);
        println!(
            "  {}: {:.4} -> {:.4} ({:+.4})",
            spec.id,
            u1,
            u2,
            u2 - u1
        );
    }

    // The packaged driver produces the same flow as a JSON report.
    let report = muxalloc::run_two_round_game(&scenario)?;
    let out_dir = std::env::temp_dir();
    let path = write_report_json(&report, &out_dir)?;
    println!("\nFull report written to {}", path.display());

    Ok(())
}
