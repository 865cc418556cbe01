//! The registry of top-level example groups for one run.

use crate::filter::FilterSet;
use crate::group::ExampleGroup;

#[derive(Debug, Default)]
pub struct World {
    groups: Vec<ExampleGroup>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a top-level group. Registration order is run order.
    pub fn register(&mut self, group: ExampleGroup) {
        tracing::trace!(group = group.description(), "registered example group");
        self.groups.push(group);
    }

    pub fn groups(&self) -> &[ExampleGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of examples `filters` selects across every group.
    pub fn total_examples_to_run(&self, filters: &FilterSet) -> usize {
        self.groups.iter().map(|g| g.count_selected(filters)).sum()
    }

    /// Groups with at least one selected example, in registration order.
    pub fn example_groups_to_run(&self, filters: &FilterSet) -> Vec<&ExampleGroup> {
        self.groups.iter().filter(|g| g.has_selected(filters)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::group::Example;

    fn world() -> World {
        let mut world = World::new();
        world.register(
            ExampleGroup::describe("Stack")
                .it("pushes", |_| Ok(()))
                .example(Example::new("pops").tag("slow", true).body(|_| Ok(()))),
        );
        world.register(ExampleGroup::describe("Queue").it("enqueues", |_| Ok(())));
        world
    }

    #[test]
    fn test_counts_every_example_without_filters() {
        let world = world();
        assert_eq!(world.total_examples_to_run(&FilterSet::new()), 3);
        assert_eq!(world.example_groups_to_run(&FilterSet::new()).len(), 2);
    }

    #[test]
    fn test_groups_without_selected_examples_are_dropped() {
        let world = world();
        let mut filters = FilterSet::new();
        filters.filter_run(Filter::tag("slow", true));
        assert_eq!(world.total_examples_to_run(&filters), 1);
        let groups = world.example_groups_to_run(&filters);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].description(), "Stack");
    }

    #[test]
    fn test_exclusion_filter_reduces_count() {
        let world = world();
        let mut filters = FilterSet::new();
        filters.filter_run_excluding(Filter::tag("slow", true));
        assert_eq!(world.total_examples_to_run(&filters), 2);
    }
}
