//! Enumeration of candidate allocation vectors

use crate::error::{Error, Result};
use crate::game::types::AllocationVector;
use itertools::Itertools;

/// Generate every allocation vector placing `subtasks` subtasks on
/// `resources` resources, one subtask per resource.
///
/// Vectors are ordered lexicographically over the chosen resource-index
/// subsets; the optimizer's tie-breaking depends on this order. The result
/// holds exactly C(resources, subtasks) distinct vectors.
pub fn generate(subtasks: usize, resources: usize) -> Result<Vec<AllocationVector>> {
    if subtasks > resources {
        return Err(Error::InvalidConfiguration(format!(
            "cannot place {subtasks} subtasks on {resources} resources"
        )));
    }

    Ok((0..resources)
        .combinations(subtasks)
        .map(|indices| AllocationVector::from_indices(resources, &indices))
        .collect())
}
