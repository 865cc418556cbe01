//! Capability requirements declared by shared example groups.
//!
//! A group that is meant to be nested into different hosts can declare what the host must provide:
//! an instance method (or `let` value), an instance variable set by a `before(:each)` hook, or a
//! class method. Requirements are checked before an example runs; an unmet one fails the example
//! with a [`MissingCapability`] instead of running its body.
//!
//! ## Notes
//!
//! - A missing class method may still be needed while building descriptive strings. Those contexts
//!   use [`missing_class_method_placeholder`]; nothing else substitutes a value.

use std::collections::BTreeMap;

use thiserror::Error;

/// A capability the host group chain must provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    InstanceMethod { name: String, description: String },
    InstanceVariable { name: String, description: String },
    ClassMethod { name: String, description: String },
}

impl Requirement {
    pub fn name(&self) -> &str {
        match self {
            Requirement::InstanceMethod { name, .. }
            | Requirement::InstanceVariable { name, .. }
            | Requirement::ClassMethod { name, .. } => name,
        }
    }

    /// The error raised when this requirement is not met.
    pub fn missing(&self) -> MissingCapability {
        match self {
            Requirement::InstanceMethod { name, description } => MissingCapability::InstanceMethod {
                name: name.clone(),
                description: description.clone(),
            },
            Requirement::InstanceVariable { name, description } => MissingCapability::InstanceVariable {
                name: name.clone(),
                description: description.clone(),
            },
            Requirement::ClassMethod { name, description } => MissingCapability::ClassMethod {
                name: name.clone(),
                description: description.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MissingCapability {
    #[error("Shared example group requires instance method :{name} ({description})")]
    InstanceMethod { name: String, description: String },

    #[error("Shared example group requires instance variable {name} ({description})")]
    InstanceVariable { name: String, description: String },

    #[error("Shared example group requires class method :{name} ({description})")]
    ClassMethod { name: String, description: String },

    /// A capability was looked up that nothing declared or provided.
    #[error("undefined capability :{name}")]
    Undefined { name: String },
}

/// Stand-in text for a missing class method inside descriptions.
pub fn missing_class_method_placeholder(name: &str) -> String {
    format!("<missing class method \"{}\">", name)
}

/// Values a group provides to itself and to the groups nested in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    instance_methods: BTreeMap<String, String>,
    class_methods: BTreeMap<String, String>,
}

impl Capabilities {
    pub fn provide_instance_method(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.instance_methods.insert(name.into(), value.into());
    }

    pub fn provide_class_method(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.class_methods.insert(name.into(), value.into());
    }

    pub fn instance_method(&self, name: &str) -> Option<&str> {
        self.instance_methods.get(name).map(String::as_str)
    }

    pub fn class_method(&self, name: &str) -> Option<&str> {
        self.class_methods.get(name).map(String::as_str)
    }

    /// Class method value for use inside descriptions.
    pub fn class_method_or_placeholder(&self, name: &str) -> String {
        match self.class_method(name) {
            Some(value) => value.to_string(),
            None => missing_class_method_placeholder(name),
        }
    }

    /// Layer `inner` over these capabilities; values from `inner` win.
    pub fn extend(&mut self, inner: &Capabilities) {
        for (name, value) in &inner.instance_methods {
            self.instance_methods.insert(name.clone(), value.clone());
        }
        for (name, value) in &inner.class_methods {
            self.class_methods.insert(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_messages() {
        let req = Requirement::InstanceMethod {
            name: "provided_method".into(),
            description: "description of what provided_method provides".into(),
        };
        assert_eq!(
            req.missing().to_string(),
            "Shared example group requires instance method :provided_method (description of what provided_method provides)"
        );

        let req = Requirement::ClassMethod {
            name: "example_class_method".into(),
            description: "what it provides".into(),
        };
        assert_eq!(
            req.missing().to_string(),
            "Shared example group requires class method :example_class_method (what it provides)"
        );

        let req = Requirement::InstanceVariable {
            name: "@host".into(),
            description: "set by host".into(),
        };
        assert_eq!(
            req.missing().to_string(),
            "Shared example group requires instance variable @host (set by host)"
        );
    }

    #[test]
    fn test_inner_capabilities_win() {
        let mut outer = Capabilities::default();
        outer.provide_instance_method("host", "outer");
        outer.provide_class_method("kind", "outer");
        let mut inner = Capabilities::default();
        inner.provide_instance_method("host", "inner");
        outer.extend(&inner);
        assert_eq!(outer.instance_method("host"), Some("inner"));
        assert_eq!(outer.class_method("kind"), Some("outer"));
    }

    #[test]
    fn test_class_method_or_placeholder() {
        let mut caps = Capabilities::default();
        caps.provide_class_method("kind", "widget");
        assert_eq!(caps.class_method_or_placeholder("kind"), "widget");
        assert_eq!(
            caps.class_method_or_placeholder("example_class_method"),
            "<missing class method \"example_class_method\">"
        );
    }

    #[test]
    fn test_placeholder() {
        assert_eq!(
            missing_class_method_placeholder("example_class_method"),
            "<missing class method \"example_class_method\">"
        );
    }
}
