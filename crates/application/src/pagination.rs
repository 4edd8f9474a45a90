use std::num::NonZeroUsize;

use roadwatch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Rows per page used by the dashboard tables.
pub const DEFAULT_PAGE_SIZE: usize = 8;

/// One page sliced out of a derived sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on the requested page.
    pub items: Vec<T>,
    /// Number of pages; at least one even for an empty sequence.
    pub total_pages: usize,
    /// One-based page number the items were taken from.
    pub current_page: usize,
}

/// Returns `max(1, ceil(len / page_size))`.
#[must_use]
pub fn total_pages(len: usize, page_size: NonZeroUsize) -> usize {
    len.div_ceil(page_size.get()).max(1)
}

/// Slices `[(current_page - 1) * page_size, current_page * page_size)`.
///
/// The caller keeps `current_page` in range; an out-of-range page yields no
/// items rather than an error.
#[must_use]
pub fn paginate<T: Clone>(items: &[T], page_size: NonZeroUsize, current_page: usize) -> Page<T> {
    let start = current_page
        .saturating_sub(1)
        .saturating_mul(page_size.get())
        .min(items.len());
    let end = start.saturating_add(page_size.get()).min(items.len());

    Page {
        items: items[start..end].to_vec(),
        total_pages: total_pages(items.len(), page_size),
        current_page,
    }
}

/// Page position of a list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    current_page: usize,
    page_size: NonZeroUsize,
}

impl Pagination {
    /// Starts on page one.
    pub fn new(page_size: usize) -> AppResult<Self> {
        let page_size = NonZeroUsize::new(page_size).ok_or_else(|| {
            AppError::Validation("page size must be greater than zero".to_owned())
        })?;

        Ok(Self {
            current_page: 1,
            page_size,
        })
    }

    /// Returns the one-based current page.
    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Returns the page size.
    #[must_use]
    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    /// Moves to page `target` when it lies in `[1, total_pages]`.
    ///
    /// Returns whether the page changed; out-of-range targets are ignored.
    pub fn go_to(&mut self, target: usize, total_pages: usize) -> bool {
        if target == 0 || target > total_pages || target == self.current_page {
            return false;
        }

        self.current_page = target;
        true
    }

    /// Moves one page forward when possible.
    pub fn next(&mut self, total_pages: usize) -> bool {
        self.go_to(self.current_page.saturating_add(1), total_pages)
    }

    /// Moves one page back when possible.
    pub fn prev(&mut self, total_pages: usize) -> bool {
        self.go_to(self.current_page.saturating_sub(1), total_pages)
    }

    /// Returns to page one.
    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    /// Resets to page one when the current page no longer exists.
    pub fn reset_if_out_of_range(&mut self, total_pages: usize) {
        if self.current_page > total_pages {
            self.reset();
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            page_size: NonZeroUsize::MIN.saturating_add(DEFAULT_PAGE_SIZE - 1),
        }
    }
}
