//! Completion-counting rendezvous for per-round submissions

use crate::error::{Error, Result};
use crate::game::types::{AllocationVector, TaskId};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Inner {
    collected: HashMap<TaskId, AllocationVector>,
    taken: bool,
}

/// Collects exactly one allocation vector per expected task
///
/// The barrier completes deterministically the moment the last expected
/// task submits; there is no polling. Submitters may run on any thread.
/// Timeouts and retries are the caller's concern, not the barrier's.
#[derive(Debug)]
pub struct SubmissionBarrier {
    expected: Vec<TaskId>,
    inner: Mutex<Inner>,
    complete: Condvar,
}

impl SubmissionBarrier {
    pub fn new(expected: Vec<TaskId>) -> Self {
        Self {
            expected,
            inner: Mutex::new(Inner::default()),
            complete: Condvar::new(),
        }
    }

    pub fn expected(&self) -> &[TaskId] {
        &self.expected
    }

    /// Register one task's allocation for the round
    ///
    /// Returns true when this submission completed the round. Unknown
    /// tasks and repeat submissions are rejected; an allocation is
    /// consumed exactly once per round.
    pub fn submit(&self, task_id: TaskId, allocation: AllocationVector) -> Result<bool> {
        if !self.expected.contains(&task_id) {
            return Err(Error::UnexpectedSubmission(task_id));
        }

        let mut inner = self.inner.lock();
        if inner.taken {
            return Err(Error::State(format!(
                "round already settled, rejecting {task_id}"
            )));
        }
        if inner.collected.contains_key(&task_id) {
            return Err(Error::DuplicateSubmission(task_id));
        }
        inner.collected.insert(task_id, allocation);

        let complete = inner.collected.len() == self.expected.len();
        if complete {
            self.complete.notify_all();
        }
        Ok(complete)
    }

    pub fn is_complete(&self) -> bool {
        self.inner.lock().collected.len() == self.expected.len()
    }

    pub fn submitted_count(&self) -> usize {
        self.inner.lock().collected.len()
    }

    /// Block until every expected task has submitted
    pub fn wait_complete(&self) {
        let mut inner = self.inner.lock();
        while inner.collected.len() < self.expected.len() {
            self.complete.wait(&mut inner);
        }
    }

    /// Hand the collected submissions to the coordinator, exactly once
    pub fn take(&self) -> Result<HashMap<TaskId, AllocationVector>> {
        let mut inner = self.inner.lock();
        if inner.collected.len() < self.expected.len() {
            return Err(Error::State(format!(
                "only {} of {} submissions received",
                inner.collected.len(),
                self.expected.len()
            )));
        }
        if inner.taken {
            return Err(Error::State("submissions already taken".into()));
        }
        inner.taken = true;
        Ok(std::mem::take(&mut inner.collected))
    }
}
