//! Offset pagination (`skip` / `limit`).

use serde::{Deserialize, Serialize};

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Missing values fall back to `skip = 0`, `limit = 10`; limits are clamped to `1..=100`.
    pub fn new(skip: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            skip: skip.unwrap_or(0),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Apply the window to an already-ordered sequence.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.skip as usize)
            .take(self.limit as usize)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        assert_eq!(Page::default(), Page { skip: 0, limit: 10 });
        assert_eq!(Page::new(Some(5), Some(0)).limit, 1);
        assert_eq!(Page::new(None, Some(10_000)).limit, Page::MAX_LIMIT);
    }

    #[test]
    fn apply_windows_sequence() {
        let page = Page::new(Some(2), Some(3));
        assert_eq!(page.apply(0..10), vec![2, 3, 4]);
        assert!(Page::new(Some(20), None).apply(0..10).is_empty());
    }
}
