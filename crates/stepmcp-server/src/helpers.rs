//! Rendering helpers for the hello view
//!
//! The view itself is rendered by an external template engine; these are the
//! pieces of data shaping it relies on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Sorted copy of `items`; the input is left untouched.
#[must_use]
pub fn sorted<T: Ord + Clone>(items: &[T]) -> Vec<T> {
    let mut copy = items.to_vec();
    copy.sort();
    copy
}

/// Back-to-front view over `items`, without copying.
pub fn reversed<T>(items: &[T]) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
    items.iter().rev()
}

/// One `"name: [v1, v2]"` line per header, ordered by header name.
#[must_use]
pub fn header_lines(headers: &HashMap<String, Vec<String>>) -> Vec<String> {
    let mut names: Vec<&String> = headers.keys().collect();
    names.sort();
    names
        .into_iter()
        .map(|name| format!("{}: [{}]", name, headers[name].join(", ")))
        .collect()
}

/// Data record for the hello page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloView {
    /// Visitor name from the query string, if given
    pub name: Option<String>,
    /// Request headers as display lines
    pub headers: Vec<String>,
}

impl HelloView {
    /// Build the view from a request's name and headers.
    #[must_use]
    pub fn new(name: Option<String>, headers: &HashMap<String, Vec<String>>) -> Self {
        Self {
            name,
            headers: header_lines(headers),
        }
    }

    /// Header lines in sorted order.
    #[must_use]
    pub fn sorted_headers(&self) -> Vec<String> {
        sorted(&self.headers)
    }
}
