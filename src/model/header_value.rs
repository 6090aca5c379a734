use serde::{Deserialize, Serialize};

/// A response header's value: either a single string, or (when the event
/// requested multi-header support) the ordered list of every value the
/// worker emitted for that header name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    /// The value a caller would use if it only cares about "the" value,
    /// regardless of which variant this is — the last one written.
    pub fn last(&self) -> &str {
        match self {
            HeaderValue::Single(v) => v,
            HeaderValue::Multi(values) => values.last().map(String::as_str).unwrap_or(""),
        }
    }

    /// Replaces the value in place (last-write-wins mode).
    pub fn overwrite(&mut self, value: String) {
        *self = HeaderValue::Single(value);
    }

    /// Appends another occurrence of this header, promoting `Single` to
    /// `Multi` the first time it happens.
    pub fn append(&mut self, value: String) {
        match self {
            HeaderValue::Single(existing) => {
                *self = HeaderValue::Multi(vec![existing.clone(), value]);
            }
            HeaderValue::Multi(values) => values.push(value),
        }
    }
}
