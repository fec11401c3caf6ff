//! Game simulation: two-round driver and reporting

pub mod report;
pub mod runner;

pub use report::{GameReport, RoundLog, TaskImprovement, TaskRoundOutcome, write_report_json};
pub use runner::run_two_round_game;
