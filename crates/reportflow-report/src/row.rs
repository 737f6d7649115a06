//! Flat output rows keyed by catalog field keys.

use std::collections::HashMap;

/// One output record: field key to rendered string value. Column order is
/// imposed by the catalog schema at serialization time, not stored here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(HashMap<String, String>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Builder-style variant of [`Row::set`].
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value for a column, empty string when the row has no such field.
    pub fn value_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let row = Row::new().with("date", "2026-01-02").with("orderCount", "3");
        assert_eq!(row.get("date"), Some("2026-01-02"));
        assert_eq!(row.value_or_empty("missing"), "");
    }
}
