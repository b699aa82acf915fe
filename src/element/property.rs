//! Criteria language
//!
//! A `CalculatedProperty` names an attribute and the value it must have,
//! literally or as a regular expression. A `Criteria` is the conjunction of
//! several properties, compiled once per resolution.

use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Value known up front or computed when the query is resolved
#[derive(Clone)]
pub enum CalculatedValue {
    Static(String),
    Computed(Arc<dyn Fn() -> String + Send + Sync>),
}

impl CalculatedValue {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        CalculatedValue::Computed(Arc::new(f))
    }

    /// Current value
    pub fn calculated(&self) -> String {
        match self {
            CalculatedValue::Static(value) => value.clone(),
            CalculatedValue::Computed(f) => f(),
        }
    }
}

impl fmt::Debug for CalculatedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalculatedValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
            CalculatedValue::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for CalculatedValue {
    fn from(value: &str) -> Self {
        CalculatedValue::Static(value.to_string())
    }
}

impl From<String> for CalculatedValue {
    fn from(value: String) -> Self {
        CalculatedValue::Static(value)
    }
}

/// Read access to an element's tag and attributes
pub trait ElementAttributes {
    fn tag(&self) -> &str;

    fn attribute(&self, name: &str) -> Option<String>;
}

/// Named expected value
#[derive(Debug, Clone)]
pub struct CalculatedProperty {
    pub name: String,
    pub value: CalculatedValue,
    pub is_regexp: bool,
}

impl CalculatedProperty {
    pub fn new<N: Into<String>, V: Into<CalculatedValue>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_regexp: false,
        }
    }

    pub fn regexp<N: Into<String>, V: Into<CalculatedValue>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_regexp: true,
        }
    }

    /// Current value of the property
    pub fn calculated(&self) -> String {
        self.value.calculated()
    }

    /// Compile this property into a matcher
    pub fn matcher(&self) -> PropertyMatcher {
        let expected = self.calculated();
        if !self.is_regexp {
            return PropertyMatcher::Exact(expected);
        }

        match Regex::new(&format!("^(?:{})$", expected)) {
            Ok(re) => PropertyMatcher::Regex(re),
            Err(e) => {
                warn!("Invalid regular expression for '{}': {}", self.name, e);
                PropertyMatcher::Never
            }
        }
    }

    /// Query hint: attribute name alone for regex, `name\tvalue` otherwise
    pub fn value_hint(&self) -> String {
        if self.is_regexp {
            self.name.clone()
        } else {
            format!("{}\t{}", self.name, self.calculated())
        }
    }
}

/// Compiled expectation on one attribute value
#[derive(Debug, Clone)]
pub enum PropertyMatcher {
    Exact(String),
    Regex(Regex),
    /// Produced by an invalid pattern
    Never,
}

impl PropertyMatcher {
    pub fn is_match(&self, value: &str) -> bool {
        match self {
            PropertyMatcher::Exact(expected) => expected == value,
            PropertyMatcher::Regex(re) => re.is_match(value),
            PropertyMatcher::Never => false,
        }
    }
}

/// Conjunction of compiled properties
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    matchers: Vec<(String, PropertyMatcher)>,
}

impl Criteria {
    /// Matches every element
    pub fn any() -> Self {
        Self::default()
    }

    /// Compile properties, evaluating computed values now
    pub fn compile(properties: &[CalculatedProperty]) -> Self {
        Self {
            matchers: properties
                .iter()
                .map(|p| (p.name.clone(), p.matcher()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// All properties hold, evaluated left to right
    pub fn matches(&self, element: &dyn ElementAttributes) -> bool {
        self.matchers.iter().all(|(name, matcher)| {
            element
                .attribute(name)
                .map(|value| matcher.is_match(&value))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Node {
        tag: String,
        attributes: HashMap<String, String>,
        reads: AtomicUsize,
    }

    impl Node {
        fn new(tag: &str, attributes: &[(&str, &str)]) -> Self {
            Self {
                tag: tag.to_string(),
                attributes: attributes
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                reads: AtomicUsize::new(0),
            }
        }
    }

    impl ElementAttributes for Node {
        fn tag(&self) -> &str {
            &self.tag
        }

        fn attribute(&self, name: &str) -> Option<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.attributes.get(name).cloned()
        }
    }

    #[test]
    fn test_exact_and_regex() {
        let node = Node::new("input", &[("name", "email"), ("id", "field-42")]);

        let criteria = Criteria::compile(&[
            CalculatedProperty::new("name", "email"),
            CalculatedProperty::regexp("id", "field-\\d+"),
        ]);
        assert!(criteria.matches(&node));

        let criteria = Criteria::compile(&[CalculatedProperty::regexp("id", "field")]);
        assert!(!criteria.matches(&node));
    }

    #[test]
    fn test_short_circuit() {
        let node = Node::new("input", &[("name", "login")]);
        let criteria = Criteria::compile(&[
            CalculatedProperty::new("name", "email"),
            CalculatedProperty::new("type", "text"),
        ]);

        assert!(!criteria.matches(&node));
        assert_eq!(node.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_attribute_and_invalid_regex() {
        let node = Node::new("input", &[]);
        assert!(!Criteria::compile(&[CalculatedProperty::new("name", "")]).matches(&node));
        assert!(Criteria::any().matches(&node));

        let node = Node::new("input", &[("name", "(")]);
        assert!(!Criteria::compile(&[CalculatedProperty::regexp("name", "(")]).matches(&node));
    }

    #[test]
    fn test_computed_value_and_hint() {
        let property = CalculatedProperty::new(
            "text",
            CalculatedValue::computed(|| format!("item-{}", 3)),
        );
        assert_eq!(property.value_hint(), "text\titem-3");
        assert_eq!(CalculatedProperty::regexp("text", ".*").value_hint(), "text");
    }
}
