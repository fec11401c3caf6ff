//! Scenario configuration: priced resources plus per-task parameters

use crate::error::{Error, Result};
use crate::game::types::{TaskId, TaskSpec};
use anyhow::Context;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Immutable description of one game: the shared price vector and every
/// task's static parameters
///
/// Constructed once and passed by reference into optimizers and the
/// coordinator; nothing in the engine mutates it. Tasks are kept in
/// canonical (ascending id) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Price per unit time for each resource, length m
    pub prices: Vec<f64>,
    pub tasks: Vec<TaskSpec>,
}

impl Scenario {
    pub fn new(prices: Vec<f64>, mut tasks: Vec<TaskSpec>) -> Result<Self> {
        if prices.is_empty() {
            return Err(Error::InvalidConfiguration("no resources".into()));
        }
        if tasks.is_empty() {
            return Err(Error::InvalidConfiguration("no tasks".into()));
        }
        tasks.sort_by_key(|t| t.id);
        for pair in tasks.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(Error::InvalidConfiguration(format!(
                    "duplicate task id {}",
                    pair[0].id
                )));
            }
        }
        for task in &tasks {
            if task.base_times.len() != prices.len() {
                return Err(Error::ShapeMismatch {
                    expected: prices.len(),
                    actual: task.base_times.len(),
                });
            }
        }
        Ok(Self { prices, tasks })
    }

    pub fn num_resources(&self) -> usize {
        self.prices.len()
    }

    pub fn num_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Task ids in canonical order
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id).collect()
    }

    pub fn spec(&self, id: TaskId) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Base execution times stacked as an n x m matrix in canonical order
    pub fn base_time_matrix(&self) -> Vec<Vec<f64>> {
        self.tasks.iter().map(|t| t.base_times.clone()).collect()
    }

    /// The three-task, five-resource scenario used throughout the tests
    /// and the demo
    pub fn reference() -> Self {
        let prices = vec![1.0, 1.2, 1.5, 1.8, 2.0];
        let tasks = vec![
            TaskSpec {
                id: TaskId(1),
                subtasks: 2,
                base_times: vec![5.0, 4.2, 3.6, 3.0, 2.8],
                weight_time: 0.88,
                weight_expense: 0.12,
                deadline: 500.0,
                budget: 20.0,
            },
            TaskSpec {
                id: TaskId(2),
                subtasks: 3,
                base_times: vec![6.0, 5.0, 4.0, 3.5, 3.0],
                weight_time: 0.89,
                weight_expense: 0.11,
                deadline: 300.0,
                budget: 30.0,
            },
            TaskSpec {
                id: TaskId(3),
                subtasks: 4,
                base_times: vec![4.0, 3.5, 3.2, 2.8, 2.4],
                weight_time: 0.90,
                weight_expense: 0.10,
                deadline: 800.0,
                budget: 30.0,
            },
        ];
        Self { prices, tasks }
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario file {}", path.display()))?;
        let raw: Scenario =
            serde_json::from_str(&json).context("failed to parse scenario json")?;
        let scenario = Scenario::new(raw.prices, raw.tasks)?;
        Ok(scenario)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize scenario")?;
        fs::write(path.as_ref(), json)
            .with_context(|| format!("failed to write scenario file {}", path.as_ref().display()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioGenParams {
    pub num_tasks: usize,
    pub num_resources: usize,
    pub price_range: (f64, f64),
    pub time_range: (f64, f64),
    pub deadline_range: (f64, f64),
    pub budget_range: (f64, f64),
    pub weight_time_range: (f64, f64),
}

impl Default for ScenarioGenParams {
    fn default() -> Self {
        Self {
            num_tasks: 3,
            num_resources: 5,
            price_range: (1.0, 2.0),
            time_range: (2.0, 6.0),
            deadline_range: (100.0, 800.0),
            budget_range: (15.0, 40.0),
            weight_time_range: (0.5, 0.95),
        }
    }
}

/// Generate a random but well-formed scenario for tests and demos
pub fn generate_random_scenario(params: &ScenarioGenParams) -> Result<Scenario> {
    let mut rng = rand::rng();
    let m = params.num_resources;

    let prices: Vec<f64> = (0..m)
        .map(|_| rng.random_range(params.price_range.0..params.price_range.1))
        .collect();

    let mut tasks = Vec::with_capacity(params.num_tasks);
    for i in 1..=params.num_tasks {
        let weight_time =
            rng.random_range(params.weight_time_range.0..params.weight_time_range.1);
        let task = TaskSpec::new(
            TaskId(i as u32),
            rng.random_range(1..=m),
            (0..m)
                .map(|_| rng.random_range(params.time_range.0..params.time_range.1))
                .collect(),
            weight_time,
            1.0 - weight_time,
            rng.random_range(params.deadline_range.0..params.deadline_range.1),
            rng.random_range(params.budget_range.0..params.budget_range.1),
        )?;
        tasks.push(task);
    }

    Scenario::new(prices, tasks)
}
