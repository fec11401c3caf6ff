//! Tests for settlement, multiplexing accounting, rounds, and the barrier

use muxalloc::game::round::next_round_times;
use muxalloc::{
    AllocationVector, Coordinator, Error, RoundPhase, Scenario, SubmissionBarrier, TaskId,
    run_two_round_game,
};
use std::collections::HashMap;
use std::sync::Arc;

fn approx(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{a} != {b}");
}

fn submissions(rows: &[(u32, &[u8])]) -> HashMap<TaskId, AllocationVector> {
    rows.iter()
        .map(|&(id, bits)| (TaskId(id), AllocationVector::from_bits(bits)))
        .collect()
}

/// The worked settlement example from the reference scenario
fn reference_submissions() -> HashMap<TaskId, AllocationVector> {
    submissions(&[
        (1, &[0, 0, 0, 1, 1]),
        (2, &[0, 0, 1, 1, 1]),
        (3, &[1, 1, 1, 0, 1]),
    ])
}

#[test]
fn settlement_scales_time_by_contention_but_not_expense() {
    let scenario = Scenario::reference();
    let mut coordinator = Coordinator::new(&scenario);
    let settlement = coordinator.process(reference_submissions()).unwrap();

    // contention per resource: [1, 1, 2, 2, 3]
    let s1 = settlement.task(TaskId(1)).unwrap();
    assert_eq!(s1.time_vector, vec![0.0, 0.0, 0.0, 2.0 * 3.0, 3.0 * 2.8]);
    approx(s1.max_time, 8.4);
    approx(s1.total_expense, 3.0 * 1.8 + 2.8 * 2.0);

    let s2 = settlement.task(TaskId(2)).unwrap();
    assert_eq!(
        s2.time_vector,
        vec![0.0, 0.0, 2.0 * 4.0, 2.0 * 3.5, 3.0 * 3.0]
    );
    approx(s2.max_time, 9.0);
    approx(s2.total_expense, 4.0 * 1.5 + 3.5 * 1.8 + 3.0 * 2.0);

    let s3 = settlement.task(TaskId(3)).unwrap();
    assert_eq!(
        s3.time_vector,
        vec![4.0, 3.5, 2.0 * 3.2, 0.0, 3.0 * 2.4]
    );
    approx(s3.max_time, 7.2);
    approx(s3.total_expense, 4.0 + 3.5 * 1.2 + 3.2 * 1.5 + 2.4 * 2.0);
}

#[test]
fn contention_equals_column_sum() {
    let scenario = Scenario::reference();
    let mut coordinator = Coordinator::new(&scenario);
    let settlement = coordinator.process(reference_submissions()).unwrap();

    let matrix = &settlement.allocations;
    for j in 0..matrix.width() {
        let column_sum: usize = (0..matrix.num_tasks())
            .filter(|&i| matrix.row(i).is_assigned(j))
            .count();
        assert_eq!(matrix.contention(j), column_sum);
    }
    assert_eq!(
        (0..5).map(|j| matrix.contention(j)).collect::<Vec<_>>(),
        vec![1, 1, 2, 2, 3]
    );
}

#[test]
fn expense_is_invariant_under_contention_changes() {
    let scenario = Scenario::reference();

    let mut coordinator = Coordinator::new(&scenario);
    let lone = coordinator
        .process(submissions(&[
            (1, &[0, 0, 0, 1, 1]),
            (2, &[1, 1, 1, 0, 0]),
            (3, &[1, 1, 1, 1, 0]),
        ]))
        .unwrap()
        .clone();

    let mut coordinator = Coordinator::new(&scenario);
    let crowded = coordinator
        .process(submissions(&[
            (1, &[0, 0, 0, 1, 1]),
            (2, &[1, 1, 0, 0, 1]),
            (3, &[1, 1, 0, 1, 1]),
        ]))
        .unwrap()
        .clone();

    let s1_lone = lone.task(TaskId(1)).unwrap();
    let s1_crowded = crowded.task(TaskId(1)).unwrap();

    // only other tasks moved onto S1's resources: expense row unchanged
    assert_eq!(s1_lone.expense_vector, s1_crowded.expense_vector);
    // resource 5 went from contention 1 to 3, time scales linearly
    approx(s1_lone.time_vector[4], 2.8);
    approx(s1_crowded.time_vector[4], 3.0 * 2.8);
}

#[test]
fn multiplexing_report_lists_only_shared_resources() {
    let scenario = Scenario::reference();
    let mut coordinator = Coordinator::new(&scenario);
    let settlement = coordinator.process(reference_submissions()).unwrap();

    let report = Coordinator::report_multiplexing(&settlement.allocations);
    assert_eq!(report.len(), 3);
    assert!(report.get(0).is_none());
    assert!(report.get(1).is_none());

    let r3 = report.get(2).unwrap();
    assert_eq!(r3.count, 2);
    assert_eq!(r3.task_ids, vec![TaskId(2), TaskId(3)]);
    let r5 = report.get(4).unwrap();
    assert_eq!(r5.count, 3);
    assert_eq!(r5.task_ids, vec![TaskId(1), TaskId(2), TaskId(3)]);

    // pure and idempotent
    let again = Coordinator::report_multiplexing(&settlement.allocations);
    assert_eq!(report, again);
}

#[test]
fn arity_mismatches_are_fatal() {
    let scenario = Scenario::reference();

    let mut incomplete = reference_submissions();
    incomplete.remove(&TaskId(2));
    let err = Coordinator::new(&scenario).process(incomplete).unwrap_err();
    assert_eq!(err, Error::IncompleteSubmission(TaskId(2)));

    let mut unexpected = reference_submissions();
    unexpected.insert(TaskId(9), AllocationVector::from_bits(&[1, 0, 0, 0, 0]));
    let err = Coordinator::new(&scenario).process(unexpected).unwrap_err();
    assert_eq!(err, Error::UnexpectedSubmission(TaskId(9)));

    let mut ragged = reference_submissions();
    ragged.insert(TaskId(2), AllocationVector::from_bits(&[1, 0, 0]));
    let err = Coordinator::new(&scenario).process(ragged).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
}

#[test]
fn round_machine_runs_exactly_two_rounds() {
    let scenario = Scenario::reference();
    let mut coordinator = Coordinator::new(&scenario);
    assert_eq!(coordinator.phase(), RoundPhase::Round1AwaitingAll);

    // round 2 cannot start before round 1 settles
    assert!(matches!(coordinator.begin_round2(), Err(Error::State(_))));

    coordinator.process(reference_submissions()).unwrap();
    assert_eq!(coordinator.phase(), RoundPhase::Round1Settled);

    // settling again without opening round 2 is a state error
    let err = coordinator.process(reference_submissions()).unwrap_err();
    assert!(matches!(err, Error::State(_)));

    coordinator.begin_round2().unwrap();
    assert_eq!(coordinator.phase(), RoundPhase::Round2AwaitingAll);
    coordinator.process(reference_submissions()).unwrap();
    assert_eq!(coordinator.phase(), RoundPhase::Round2Settled);
    assert!(coordinator.phase().is_terminal());

    // terminal: no third round
    let err = coordinator.process(reference_submissions()).unwrap_err();
    assert!(matches!(err, Error::State(_)));
    assert_eq!(coordinator.history().len(), 2);
    assert_eq!(coordinator.history()[0].round, 1);
    assert_eq!(coordinator.history()[1].round, 2);
}

#[test]
fn next_round_times_adds_column_means() {
    let actual = vec![
        vec![0.0, 0.0, 0.0, 9.0, 8.4],
        vec![0.0, 0.0, 8.0, 10.5, 9.0],
        vec![0.0, 3.5, 6.4, 8.4, 7.2],
    ];
    let base = vec![
        vec![5.0, 4.2, 3.6, 3.0, 2.8],
        vec![6.0, 5.0, 4.0, 3.5, 3.0],
        vec![4.0, 3.5, 3.2, 2.8, 2.4],
    ];
    let updated = next_round_times(&actual, &base).unwrap();

    approx(updated[0][0], 5.0);
    approx(updated[0][1], 4.2 + 3.5 / 3.0);
    approx(updated[0][2], 3.6 + (8.0 + 6.4) / 3.0);
    approx(updated[0][3], 3.0 + (9.0 + 10.5 + 8.4) / 3.0);
    approx(updated[0][4], 2.8 + (8.4 + 9.0 + 7.2) / 3.0);
    approx(updated[2][3], 2.8 + (9.0 + 10.5 + 8.4) / 3.0);
}

#[test]
fn next_round_times_rejects_ragged_input() {
    let base = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
    let short = vec![vec![1.0, 2.0]];
    assert!(matches!(
        next_round_times(&short, &base),
        Err(Error::ShapeMismatch { .. })
    ));

    let ragged = vec![vec![1.0, 2.0], vec![3.0]];
    assert!(matches!(
        next_round_times(&ragged, &base),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn barrier_completes_once_all_tasks_submit() {
    let barrier = Arc::new(SubmissionBarrier::new(vec![TaskId(1), TaskId(2), TaskId(3)]));

    let mut handles = Vec::new();
    for id in 1..=3u32 {
        let barrier = Arc::clone(&barrier);
        handles.push(std::thread::spawn(move || {
            barrier
                .submit(TaskId(id), AllocationVector::from_bits(&[1, 0]))
                .unwrap();
        }));
    }
    barrier.wait_complete();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(barrier.is_complete());
    let collected = barrier.take().unwrap();
    assert_eq!(collected.len(), 3);
}

#[test]
fn barrier_rejects_strays_and_repeats() {
    let barrier = SubmissionBarrier::new(vec![TaskId(1), TaskId(2)]);
    let alloc = AllocationVector::from_bits(&[1, 0]);

    assert_eq!(
        barrier.submit(TaskId(7), alloc.clone()).unwrap_err(),
        Error::UnexpectedSubmission(TaskId(7))
    );

    assert!(!barrier.submit(TaskId(1), alloc.clone()).unwrap());
    assert_eq!(
        barrier.submit(TaskId(1), alloc.clone()).unwrap_err(),
        Error::DuplicateSubmission(TaskId(1))
    );

    // taking early is a state error, not a partial result
    assert!(matches!(barrier.take(), Err(Error::State(_))));

    assert!(barrier.submit(TaskId(2), alloc.clone()).unwrap());
    barrier.take().unwrap();

    // the round's submissions are consumed exactly once
    assert!(matches!(barrier.take(), Err(Error::State(_))));
    assert!(matches!(barrier.submit(TaskId(2), alloc), Err(Error::State(_))));
}

#[test]
fn two_round_game_matches_reference_scenario() {
    let scenario = Scenario::reference();
    let report = run_two_round_game(&scenario).unwrap();
    assert_eq!(report.rounds.len(), 2);

    let round1 = report.round(1).unwrap();
    let picks: Vec<_> = round1.outcomes.iter().map(|o| &o.allocation).collect();
    assert_eq!(*picks[0], AllocationVector::from_bits(&[0, 0, 0, 1, 1]));
    assert_eq!(*picks[1], AllocationVector::from_bits(&[0, 0, 1, 1, 1]));
    assert_eq!(*picks[2], AllocationVector::from_bits(&[0, 1, 1, 1, 1]));

    approx(
        round1.outcomes[0].expected_utility,
        1.0 / (0.88 * 3.0 + 0.12 * 11.0),
    );
    // resources 4 and 5 end up shared by all three tasks
    approx(round1.outcomes[0].actual_utility, 1.0 / (0.88 * 9.0 + 0.12 * 11.0));
    approx(
        round1.outcomes[1].actual_utility,
        1.0 / (0.89 * 10.5 + 0.11 * 18.3),
    );
    approx(
        round1.outcomes[2].actual_utility,
        1.0 / (0.90 * 8.4 + 0.10 * 18.84),
    );
    for outcome in &round1.outcomes {
        assert!(outcome.feasible);
        assert!(outcome.utility_loss > 0.0);
    }

    let shared: Vec<_> = round1.shared_resources.iter().map(|(j, _)| j).collect();
    assert_eq!(shared, vec![2, 3, 4]);
}

#[test]
fn round_two_settles_against_original_base_times() {
    let scenario = Scenario::reference();
    let report = run_two_round_game(&scenario).unwrap();
    let round2 = report.round(2).unwrap();

    // the congestion forecast pushes everyone down to the cheap resources
    let picks: Vec<_> = round2.outcomes.iter().map(|o| &o.allocation).collect();
    assert_eq!(*picks[0], AllocationVector::from_bits(&[1, 1, 0, 0, 0]));
    assert_eq!(*picks[1], AllocationVector::from_bits(&[1, 1, 1, 0, 0]));
    assert_eq!(*picks[2], AllocationVector::from_bits(&[1, 1, 1, 1, 0]));

    // settled against ORIGINAL base times: S1 on resource 1 pays
    // contention 3 times base 5.0, not a forecast-derived figure
    approx(round2.outcomes[0].max_time, 3.0 * 5.0);
    approx(
        round2.outcomes[0].actual_utility,
        1.0 / (0.88 * 15.0 + 0.12 * (5.0 * 1.0 + 4.2 * 1.2)),
    );
    approx(
        round2.outcomes[1].actual_utility,
        1.0 / (0.89 * 18.0 + 0.11 * (6.0 + 6.0 + 6.0)),
    );
    approx(
        round2.outcomes[2].actual_utility,
        1.0 / (0.90 * 12.0 + 0.10 * (4.0 + 4.2 + 4.8 + 5.04)),
    );
}
