//! Optimization and contention-accounting engine

pub mod barrier;
pub mod coordinator;
pub mod generator;
pub mod logging;
pub mod optimizer;
pub mod round;
pub mod types;
pub mod utility;

pub use barrier::SubmissionBarrier;
pub use coordinator::{
    Coordinator, MultiplexingReport, RoundPhase, Settlement, SharedResource, TaskSettlement,
};
pub use optimizer::{OptimizeOutcome, Optimizer};
pub use round::next_round_times;
pub use types::*;
