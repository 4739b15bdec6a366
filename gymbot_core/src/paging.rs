//! Pure pagination over ordered lists.
//!
//! Used identically by the exercise picker and the workout history view.

/// A bounded page of a larger list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// The page actually served, clamped into `[0, total_pages - 1]`
    pub page: usize,
    /// Always at least 1, even for an empty list
    pub total_pages: usize,
}

impl<'a, T> Page<'a, T> {
    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }
}

/// Slice out one page of `items`.
///
/// `total_pages = max(1, ceil(len / page_size))`; the requested page is
/// clamped into range (negative requests land on page 0), so navigation can
/// never escape the list.
///
/// # Panics
/// Panics if `page_size` is zero; config validation rejects that before any
/// caller can reach here.
pub fn paginate<T>(items: &[T], page: i64, page_size: usize) -> Page<'_, T> {
    assert!(page_size > 0, "page_size must be at least 1");

    let total_pages = (items.len().div_ceil(page_size)).max(1);
    let clamped = page.clamp(0, total_pages as i64 - 1) as usize;

    let start = clamped * page_size;
    let end = (start + page_size).min(items.len());
    let slice = if start >= items.len() {
        &items[0..0]
    } else {
        &items[start..end]
    };

    Page {
        items: slice,
        page: clamped,
        total_pages,
    }
}
