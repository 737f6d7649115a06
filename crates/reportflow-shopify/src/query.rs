//! Search predicate builder for Admin API queries.
//!
//! Predicates are ANDed clauses; multi-value filter groups become OR chains
//! wrapped in parentheses when they join an existing predicate.

use chrono::SecondsFormat;
use reportflow_core::daterange::ResolvedRange;

/// Accumulates AND-joined clauses, mirroring the API search syntax.
#[derive(Debug, Default)]
pub struct SearchQuery {
    clauses: Vec<String>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw clause.
    pub fn and(mut self, clause: impl Into<String>) -> Self {
        self.clauses.push(clause.into());
        self
    }

    /// Append an OR group if present. The first clause of a query stands
    /// alone; later groups are parenthesized.
    pub fn and_group(mut self, group: Option<String>) -> Self {
        if let Some(g) = group {
            if self.clauses.is_empty() {
                self.clauses.push(g);
            } else {
                self.clauses.push(format!("({g})"));
            }
        }
        self
    }

    /// Final predicate, or `None` when nothing was added (unfiltered query).
    pub fn build(self) -> Option<String> {
        if self.clauses.is_empty() {
            None
        } else {
            Some(self.clauses.join(" AND "))
        }
    }
}

/// Inclusive creation-date bounds matching the resolver's UTC day alignment.
pub fn date_clause(range: &ResolvedRange) -> String {
    format!(
        "created_at:>='{}' AND created_at:<='{}'",
        range.start.to_rfc3339_opts(SecondsFormat::Millis, true),
        range.end.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// `field:value OR field:value ...`; `None` when the filter is empty.
pub fn or_group(field: &str, values: &[&str]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    Some(
        values
            .iter()
            .map(|v| format!("{field}:{v}"))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}

/// Like [`or_group`] but with quoted values, for fields that contain spaces
/// (product types, vendor names).
pub fn quoted_or_group(field: &str, values: &[&str]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    Some(
        values
            .iter()
            .map(|v| format!("{field}:'{v}'"))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}
