//! Ordered, named step registry with declared dependencies.
//!
//! `resolve_order` produces the dependency-ordered step sequence used to
//! build a `RunPlan`. Steps with no ordering constraint between them keep
//! their registration order, so output is deterministic and testable.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::types::plan::RunPlan;
use crate::types::step::Step;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate step id: {0}")]
    DuplicateStep(String),
    #[error("step {step} depends on unknown step {dependency}")]
    UnknownDependency { step: String, dependency: String },
    #[error("dependency cycle: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),
    #[error("unknown step id: {0}")]
    UnknownStep(String),
}

#[derive(Debug, Default)]
pub struct StepRegistry {
    steps: Vec<Step>,
    index: HashMap<String, usize>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, step: Step) -> Result<(), RegistryError> {
        if self.index.contains_key(&step.id) {
            return Err(RegistryError::DuplicateStep(step.id));
        }
        self.index.insert(step.id.clone(), self.steps.len());
        self.steps.push(step);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Step> {
        self.index.get(id).map(|&i| &self.steps[i])
    }

    /// Topologically order every registered step.
    ///
    /// # Errors
    ///
    /// `UnknownDependency` when a step names an unregistered id;
    /// `CyclicDependency` naming the cycle when the graph is not a DAG.
    pub fn resolve_order(&self) -> Result<RunPlan, RegistryError> {
        for step in &self.steps {
            for dep in &step.depends_on {
                if !self.index.contains_key(dep) {
                    return Err(RegistryError::UnknownDependency {
                        step: step.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let n = self.steps.len();
        let mut indegree = vec![0usize; n];
        for step in &self.steps {
            let i = self.index[&step.id];
            // Count distinct dependencies so a repeated id cannot wedge
            // the sort.
            let uniq: HashSet<&str> = step.depends_on.iter().map(String::as_str).collect();
            indegree[i] = uniq.len();
        }

        let mut emitted = vec![false; n];
        let mut order: Vec<usize> = Vec::with_capacity(n);
        // Kahn's algorithm, scanning in registration order so unordered
        // peers come out in the order they were registered. Quadratic in
        // step count, which stays tiny for provisioning plans.
        while order.len() < n {
            let next = (0..n).find(|&i| !emitted[i] && indegree[i] == 0);
            let Some(i) = next else {
                return Err(RegistryError::CyclicDependency(self.find_cycle(&emitted)));
            };
            emitted[i] = true;
            order.push(i);
            let id = &self.steps[i].id;
            for (j, step) in self.steps.iter().enumerate() {
                if !emitted[j] && step.depends_on.iter().any(|d| d == id) {
                    indegree[j] -= 1;
                }
            }
        }

        Ok(RunPlan {
            steps: order.into_iter().map(|i| self.steps[i].clone()).collect(),
        })
    }

    /// Walk dependency edges among unemitted steps until one repeats,
    /// then return the cycle path for the error message.
    fn find_cycle(&self, emitted: &[bool]) -> Vec<String> {
        let Some(start) = (0..self.steps.len()).find(|&i| !emitted[i]) else {
            return Vec::new();
        };
        let mut seen: Vec<usize> = Vec::new();
        let mut cur = start;
        loop {
            if let Some(pos) = seen.iter().position(|&i| i == cur) {
                let mut cycle: Vec<String> =
                    seen[pos..].iter().map(|&i| self.steps[i].id.clone()).collect();
                cycle.push(self.steps[cur].id.clone());
                return cycle;
            }
            seen.push(cur);
            // Follow any dependency that is still unemitted; in a stuck
            // graph every stuck node has at least one such edge.
            let next = self.steps[cur]
                .depends_on
                .iter()
                .filter_map(|d| self.index.get(d).copied())
                .find(|&i| !emitted[i]);
            match next {
                Some(i) => cur = i,
                None => return seen.iter().map(|&i| self.steps[i].id.clone()).collect(),
            }
        }
    }
}
