//! Dependency layering for a plan.
//!
//! A task depends on another task of the same plan when one of its `ref`
//! inputs names that task's id. References to any other name are context
//! bindings and impose no ordering.

use std::collections::HashMap;

use reasoner_core::{Error, Result, Task};

/// Split a plan into waves of task indices.
///
/// Every task of wave `n` depends only on tasks of earlier waves. Within a
/// wave, indices keep plan order. Fails on a dependency cycle.
pub fn plan_waves(tasks: &[Task]) -> Result<Vec<Vec<usize>>> {
    let index: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| (task.id.as_str(), i))
        .collect();

    // dependency -> dependents
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
    let mut in_degree: Vec<usize> = vec![0; tasks.len()];

    for (i, task) in tasks.iter().enumerate() {
        let mut seen = Vec::new();
        for name in task.references() {
            if let Some(&dep) = index.get(name) {
                if !seen.contains(&dep) {
                    seen.push(dep);
                    dependents[dep].push(i);
                    in_degree[i] += 1;
                }
            }
        }
    }

    // Kahn's algorithm, one layer at a time
    let mut waves = Vec::new();
    let mut current: Vec<usize> = (0..tasks.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut placed = 0;

    while !current.is_empty() {
        placed += current.len();
        let mut next = Vec::new();
        for &i in &current {
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    next.push(dependent);
                }
            }
        }
        next.sort_unstable();
        waves.push(current);
        current = next;
    }

    if placed != tasks.len() {
        let stuck: Vec<&str> = tasks
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, task)| task.id.as_str())
            .collect();
        return Err(Error::controller(format!(
            "Cycle detected among tasks: {}",
            stuck.join(", ")
        )));
    }

    Ok(waves)
}
