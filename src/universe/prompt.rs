//! Deterministic prompt template for universe tasks

use crate::orchestration::task::Task;
use crate::universe::catalog::Universe;

/// Build the generation prompt for one universe
///
/// The prompt depends only on the universe's name and description, so the
/// same universe always yields the same text.
pub fn build_prompt(universe: &Universe) -> String {
    format!(
        "Reimagine this photo as if it existed in a {name} universe. \
         Restyle the entire scene with {description}. \
         Keep the main subject, its pose and the overall composition recognisable, \
         and render the result as a single cohesive, high-detail image.",
        name = universe.name,
        description = universe.description,
    )
}

/// Turn universes into tasks, building each prompt exactly once
pub fn build_tasks<'a>(universes: impl IntoIterator<Item = &'a Universe>) -> Vec<Task> {
    universes
        .into_iter()
        .map(|universe| Task::new(universe.task_id(), build_prompt(universe)))
        .collect()
}
