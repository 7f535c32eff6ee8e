//! Long-running workflows built on [`Pipeline`](crate::pipeline::Pipeline).
//!
//! Each constructor validates its inputs up front and returns a sealed pipeline,
//! so callers can show [`plan`](crate::pipeline::Pipeline::plan) before running.

pub mod knowledge_base;
pub mod resonance;
pub mod seo_audit;

pub use knowledge_base::{KnowledgeDraft, knowledge_base};
pub use resonance::resonance_test;
pub use seo_audit::seo_audit;

use std::collections::{HashMap, HashSet};

/// Trims `values`, drops blanks and repeats, and keeps first-seen order.
pub(crate) fn distinct_values<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(str::trim)
        .filter(|value| !value.is_empty() && seen.insert(*value))
        .map(str::to_string)
        .collect()
}

/// Makes stage labels unique so each gets its own task-list row.
///
/// Blank labels are dropped; repeats get a ` (2)`, ` (3)` ... suffix.
pub(crate) fn distinct_labels<'a, I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    labels
        .into_iter()
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(|label| {
            let count = seen.entry(label.to_string()).or_insert(0);
            *count += 1;
            if *count == 1 { label.to_string() } else { format!("{label} ({count})") }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_labels() {
        let labels = distinct_labels(["a.com", " ", "b.com", "a.com", "a.com "]);
        assert_eq!(labels, vec!["a.com", "b.com", "a.com (2)", "a.com (3)"]);
    }

    #[test]
    fn test_distinct_values() {
        let values = distinct_values(["b.com", "a.com", " ", "b.com ", "a.com"]);
        assert_eq!(values, vec!["b.com", "a.com"]);
    }
}
