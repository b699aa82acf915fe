//! Occurrence predicates

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::{Error, Result};

/// Comparison operator of an occurrence assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Lower,
    LowerOrEqual,
}

impl Comparison {
    pub fn test(&self, count: usize, expected: usize) -> bool {
        match self {
            Comparison::Equal => count == expected,
            Comparison::NotEqual => count != expected,
            Comparison::Greater => count > expected,
            Comparison::GreaterOrEqual => count >= expected,
            Comparison::Lower => count < expected,
            Comparison::LowerOrEqual => count <= expected,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Equal => "=",
            Comparison::NotEqual => "!=",
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Lower => "<",
            Comparison::LowerOrEqual => "<=",
        }
    }
}

impl FromStr for Comparison {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "=" | "==" => Ok(Comparison::Equal),
            "!=" | "<>" => Ok(Comparison::NotEqual),
            ">" => Ok(Comparison::Greater),
            ">=" => Ok(Comparison::GreaterOrEqual),
            "<" => Ok(Comparison::Lower),
            "<=" => Ok(Comparison::LowerOrEqual),
            other => Err(Error::invalid_criteria(format!("unknown operator '{}'", other))),
        }
    }
}

/// Predicate over the number of matched elements
#[derive(Clone)]
pub struct Occurrences {
    predicate: Arc<dyn Fn(usize) -> bool + Send + Sync>,
    description: String,
}

impl Occurrences {
    /// `count > 0`
    pub fn at_least_one() -> Self {
        Self::custom("> 0", |count| count > 0)
    }

    /// Accepts any count
    pub fn any() -> Self {
        Self::custom("any", |_| true)
    }

    pub fn exactly(expected: usize) -> Self {
        Self::compare(Comparison::Equal, expected)
    }

    pub fn compare(operator: Comparison, expected: usize) -> Self {
        Self::custom(format!("{} {}", operator.symbol(), expected), move |count| {
            operator.test(count, expected)
        })
    }

    pub fn custom<S, F>(description: S, predicate: F) -> Self
    where
        S: Into<String>,
        F: Fn(usize) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            description: description.into(),
        }
    }

    pub fn test(&self, count: usize) -> bool {
        (self.predicate)(count)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Default for Occurrences {
    fn default() -> Self {
        Self::at_least_one()
    }
}

impl fmt::Debug for Occurrences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Occurrences")
            .field("description", &self.description)
            .finish()
    }
}
