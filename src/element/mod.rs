//! Element resolution
//!
//! A `SearchedElement` query is resolved by a `TestElement` against the
//! engine of a channel. Resolution yields `FoundElement` handles filtered by
//! `Criteria`; an `Occurrences` predicate validates the resulting count and
//! actions are retried through a `RetryPolicy` while the backend reports
//! transient failures.

pub mod property;
pub mod searched;
pub mod found;
pub mod occurrences;
pub mod retry;
pub mod test_element;

#[cfg(test)]
mod tests;

pub use found::FoundElement;
pub use occurrences::{Comparison, Occurrences};
pub use property::{CalculatedProperty, CalculatedValue, Criteria, ElementAttributes, PropertyMatcher};
pub use retry::{Backoff, RetryOutcome, RetryPolicy};
pub use searched::SearchedElement;
pub use test_element::{Parameter, TestElement};
