//! Inclusion and exclusion filters.
//!
//! A [`Filter`] is a set of named predicates: an optional line number, an optional full-description
//! pattern and any number of tags. A subject satisfies a filter when it satisfies every predicate the
//! filter carries. The same type is used to select examples and to decide which hooks apply to a group.
//!
//! ## Notes
//!
//! - Once the inclusion filter is keyed on a line number or a full description it is locked: later
//!   calls to [`FilterSet::filter_run`] cannot replace it and may only add tags it does not have yet.

use std::fmt;

use regex::Regex;

use crate::metadata::{Metadata, MetadataValue};

/// Something a filter can be evaluated against (an example in its group chain, or a group chain).
pub trait FilterSubject {
    /// Whether the subject is declared at (or contains a declaration at) `line`.
    fn matches_line(&self, line: u32) -> bool;

    /// Full description used by description patterns.
    fn full_description(&self) -> String;

    /// Nearest value for tag `name`.
    fn tag(&self, name: &str) -> Option<&MetadataValue>;
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    line_number: Option<u32>,
    full_description: Option<Regex>,
    tags: Metadata,
}

impl Filter {
    /// An empty filter; satisfied by everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_number(line: u32) -> Self {
        Self {
            line_number: Some(line),
            ..Self::default()
        }
    }

    pub fn full_description(pattern: Regex) -> Self {
        Self {
            full_description: Some(pattern),
            ..Self::default()
        }
    }

    pub fn tag(name: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::new().with_tag(name, value)
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.tags.insert(name, value);
        self
    }

    pub fn get_line_number(&self) -> Option<u32> {
        self.line_number
    }

    pub fn get_full_description(&self) -> Option<&Regex> {
        self.full_description.as_ref()
    }

    pub fn tags(&self) -> &Metadata {
        &self.tags
    }

    pub fn is_empty(&self) -> bool {
        self.line_number.is_none() && self.full_description.is_none() && self.tags.is_empty()
    }

    /// Keyed on line number or full description.
    pub fn is_locked(&self) -> bool {
        self.line_number.is_some() || self.full_description.is_some()
    }

    /// Check every predicate of this filter against `subject`.
    pub fn applies_to(&self, subject: &dyn FilterSubject) -> bool {
        if let Some(line) = self.line_number {
            if !subject.matches_line(line) {
                return false;
            }
        }
        if let Some(pattern) = &self.full_description {
            if !pattern.is_match(&subject.full_description()) {
                return false;
            }
        }
        self.tags
            .iter()
            .all(|(name, expected)| subject.tag(name) == Some(expected))
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.line_number == other.line_number
            && self.full_description.as_ref().map(Regex::as_str) == other.full_description.as_ref().map(Regex::as_str)
            && self.tags == other.tags
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(line) = self.line_number {
            parts.push(format!("line_number: {}", line));
        }
        if let Some(pattern) = &self.full_description {
            parts.push(format!("full_description: /{}/", pattern.as_str()));
        }
        for (name, value) in self.tags.iter() {
            parts.push(format!("{}: {}", name, value));
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// The two filters of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    inclusion: Option<Filter>,
    exclusion: Option<Filter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `criteria` as the inclusion filter.
    ///
    /// A filter keyed on line number or full description, once installed, is never replaced; only
    /// tags it does not carry yet are added to it.
    pub fn filter_run(&mut self, criteria: Filter) {
        match &mut self.inclusion {
            Some(current) if current.is_locked() => {
                for (name, value) in criteria.tags.iter() {
                    if !current.tags.contains(name) {
                        current.tags.insert(name.clone(), value.clone());
                    }
                }
            }
            _ => self.inclusion = Some(criteria),
        }
    }

    /// Install `criteria` as the exclusion filter.
    pub fn filter_run_excluding(&mut self, criteria: Filter) {
        self.exclusion = Some(criteria);
    }

    pub fn inclusion(&self) -> Option<&Filter> {
        self.inclusion.as_ref()
    }

    pub fn exclusion(&self) -> Option<&Filter> {
        self.exclusion.as_ref()
    }

    /// Whether `subject` passes the inclusion filter and is not caught by the exclusion filter.
    pub fn selects(&self, subject: &dyn FilterSubject) -> bool {
        let included = self.inclusion.as_ref().is_none_or(|f| f.applies_to(subject));
        let excluded = self
            .exclusion
            .as_ref()
            .is_some_and(|f| !f.is_empty() && f.applies_to(subject));
        included && !excluded
    }

    /// Same filters with the inclusion filter dropped.
    pub fn without_inclusion(&self) -> FilterSet {
        FilterSet {
            inclusion: None,
            exclusion: self.exclusion.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Subject {
        line: u32,
        description: &'static str,
        tags: Metadata,
    }

    impl FilterSubject for Subject {
        fn matches_line(&self, line: u32) -> bool {
            self.line == line
        }

        fn full_description(&self) -> String {
            self.description.to_string()
        }

        fn tag(&self, name: &str) -> Option<&MetadataValue> {
            self.tags.get(name)
        }
    }

    fn subject(line: u32, description: &'static str) -> Subject {
        Subject {
            line,
            description,
            tags: Metadata::new(),
        }
    }

    #[test]
    fn test_empty_filter_applies_to_everything() {
        assert!(Filter::new().applies_to(&subject(1, "anything")));
    }

    #[test]
    fn test_line_number_filter() {
        let filter = Filter::line_number(42);
        assert!(filter.applies_to(&subject(42, "a")));
        assert!(!filter.applies_to(&subject(41, "a")));
    }

    #[test]
    fn test_full_description_filter() {
        let filter = Filter::full_description(Regex::new("stack pops").unwrap());
        assert!(filter.applies_to(&subject(1, "Stack pops the last item")));
        assert!(!filter.applies_to(&subject(1, "Stack pushes")));
    }

    #[test]
    fn test_tag_filter_requires_equal_value() {
        let filter = Filter::tag("slow", true);
        let mut tagged = subject(1, "a");
        tagged.tags.insert("slow", true);
        assert!(filter.applies_to(&tagged));

        tagged.tags.insert("slow", false);
        assert!(!filter.applies_to(&tagged));
        assert!(!filter.applies_to(&subject(1, "a")));
    }

    #[test]
    fn test_filter_run_first_line_number_wins() {
        let mut filters = FilterSet::new();
        filters.filter_run(Filter::line_number(42));
        filters.filter_run(Filter::line_number(7));
        assert_eq!(filters.inclusion(), Some(&Filter::line_number(42)));
    }

    #[test]
    fn test_filter_run_locked_filter_still_gains_new_tags() {
        let mut filters = FilterSet::new();
        filters.filter_run(Filter::line_number(42));
        filters.filter_run(Filter::tag("focus", true));
        assert_eq!(filters.inclusion(), Some(&Filter::line_number(42).with_tag("focus", true)));
    }

    #[test]
    fn test_filter_run_replaces_tag_only_filter() {
        let mut filters = FilterSet::new();
        filters.filter_run(Filter::tag("focus", true));
        filters.filter_run(Filter::line_number(3));
        assert_eq!(filters.inclusion(), Some(&Filter::line_number(3)));
    }

    #[test]
    fn test_exclusion_filter_removes_matching_subjects() {
        let mut filters = FilterSet::new();
        filters.filter_run_excluding(Filter::tag("broken", true));
        let mut broken = subject(1, "a");
        broken.tags.insert("broken", true);
        assert!(!filters.selects(&broken));
        assert!(filters.selects(&subject(1, "a")));
    }

    #[test]
    fn test_display_lists_predicates() {
        let filter = Filter::line_number(42).with_tag("slow", true);
        assert_eq!(filter.to_string(), "{line_number: 42, slow: true}");
    }
}
