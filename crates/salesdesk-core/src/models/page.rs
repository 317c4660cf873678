use serde::{Deserialize, Serialize};

/// A list response: paginated `{count, results}` or a bare array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Page<T> {
    Paged { count: u64, results: Vec<T> },
    Bare(Vec<T>),
}

impl<T> Page<T> {
    /// Total number of records on the server (for bare lists, the list length).
    pub fn count(&self) -> u64 {
        match self {
            Page::Paged { count, .. } => *count,
            Page::Bare(items) => items.len() as u64,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            Page::Paged { results, .. } => results,
            Page::Bare(items) => items,
        }
    }
}

impl<T> From<Page<T>> for Vec<T> {
    fn from(page: Page<T>) -> Self {
        page.into_items()
    }
}
