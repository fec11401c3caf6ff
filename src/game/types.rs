//! Core types for the allocation game

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct TaskId(pub u32);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

impl From<u32> for TaskId {
    fn from(v: u32) -> Self {
        TaskId(v)
    }
}

/// Static configuration of a single task for one round
///
/// `base_times[j]` is the time resource j needs to complete one subtask of
/// this task when it runs alone. `weight_time + weight_expense = 1` by
/// convention; the sum is not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: TaskId,
    /// Number of subtasks (k), each placed on a distinct resource
    pub subtasks: usize,
    /// Base execution time per resource, length m
    pub base_times: Vec<f64>,
    pub weight_time: f64,
    pub weight_expense: f64,
    /// Maximum allowed completion time in seconds
    pub deadline: f64,
    /// Maximum allowed total expense
    pub budget: f64,
}

impl TaskSpec {
    pub fn new(
        id: TaskId,
        subtasks: usize,
        base_times: Vec<f64>,
        weight_time: f64,
        weight_expense: f64,
        deadline: f64,
        budget: f64,
    ) -> Result<Self> {
        if subtasks == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "task {id} has no subtasks"
            )));
        }
        if subtasks > base_times.len() {
            return Err(Error::InvalidConfiguration(format!(
                "task {id} has {subtasks} subtasks but only {} resources",
                base_times.len()
            )));
        }
        Ok(Self {
            id,
            subtasks,
            base_times,
            weight_time,
            weight_expense,
            deadline,
            budget,
        })
    }
}

impl std::fmt::Display for TaskSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Binary choice of which resources a task's subtasks occupy
///
/// Immutable once produced. Vectors coming out of the generator carry
/// exactly `k` ones; that invariant is enforced at generation, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllocationVector(Vec<bool>);

impl AllocationVector {
    /// Build from 0/1 bits; any nonzero entry counts as allocated
    pub fn from_bits(bits: &[u8]) -> Self {
        Self(bits.iter().map(|&b| b != 0).collect())
    }

    /// Build a vector of length `len` with ones at the given resource indices
    pub(crate) fn from_indices(len: usize, indices: &[usize]) -> Self {
        let mut bits = vec![false; len];
        for &j in indices {
            bits[j] = true;
        }
        Self(bits)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether resource j carries a subtask
    pub fn is_assigned(&self, j: usize) -> bool {
        self.0[j]
    }

    /// Number of allocated resources
    pub fn ones(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

impl std::fmt::Display for AllocationVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits = self
            .0
            .iter()
            .map(|&b| if b { "1" } else { "0" })
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "({bits})")
    }
}

/// One allocation vector per task, rows in canonical (ascending id) order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationMatrix {
    task_ids: Vec<TaskId>,
    rows: Vec<AllocationVector>,
    width: usize,
}

impl AllocationMatrix {
    /// Stack one row per task. All rows must share the same width and
    /// `task_ids` must pair up with `rows`.
    pub fn new(task_ids: Vec<TaskId>, rows: Vec<AllocationVector>) -> Result<Self> {
        if task_ids.len() != rows.len() {
            return Err(Error::ShapeMismatch {
                expected: task_ids.len(),
                actual: rows.len(),
            });
        }
        let width = rows.first().map_or(0, AllocationVector::len);
        for row in &rows {
            if row.len() != width {
                return Err(Error::ShapeMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
        }
        Ok(Self {
            task_ids,
            rows,
            width,
        })
    }

    pub fn num_tasks(&self) -> usize {
        self.rows.len()
    }

    /// Number of resources (columns)
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn task_ids(&self) -> &[TaskId] {
        &self.task_ids
    }

    pub fn row(&self, i: usize) -> &AllocationVector {
        &self.rows[i]
    }

    pub fn rows(&self) -> &[AllocationVector] {
        &self.rows
    }

    /// Contention factor of resource j: how many tasks put a subtask on it
    pub fn contention(&self, j: usize) -> usize {
        self.rows.iter().filter(|row| row.is_assigned(j)).count()
    }
}
