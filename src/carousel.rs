//! Paged grid with a prev/next viewer that walks across page boundaries.
//!
//! Indices are absolute positions in the full (filtered, ordered) sequence;
//! pages are 1-based. Moving past either end of the sequence does nothing,
//! there is no wrap-around.

/// Viewport classes and their grid page sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewport {
    /// One column
    Mobile,
    /// Two columns
    Tablet,
    /// Three columns
    Desktop,
    /// Four columns
    Wide,
}

impl Viewport {
    pub fn page_size(self) -> usize {
        match self {
            Viewport::Mobile => 12,
            Viewport::Tablet | Viewport::Desktop => 24,
            Viewport::Wide => 48,
        }
    }
}

/// Slice of `items` shown on `page` (1-based)
pub fn page_window<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carousel {
    len: usize,
    page_size: usize,
    page: usize,
    current: Option<usize>,
}

impl Carousel {
    pub fn new(len: usize, page_size: usize) -> Self {
        Self {
            len,
            page_size: page_size.max(1),
            page: 1,
            current: None,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Absolute index of the opened item, if any
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn total_pages(&self) -> usize {
        self.len.div_ceil(self.page_size).max(1)
    }

    fn start(&self) -> usize {
        (self.page - 1) * self.page_size
    }

    fn end(&self) -> usize {
        self.start() + self.page_size
    }

    pub fn page_window<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        page_window(items, self.page, self.page_size)
    }

    pub fn current_item<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        self.current.and_then(|idx| items.get(idx))
    }

    /// Whether the item at `relative` on the current page is the opened one
    pub fn is_current(&self, relative: usize) -> bool {
        relative < self.page_size && self.current == Some(self.start() + relative)
    }

    /// Open the item at `relative` within the current page
    pub fn open(&mut self, relative: usize) {
        if relative >= self.page_size {
            return;
        }
        let idx = self.start() + relative;
        if idx < self.len {
            self.current = Some(idx);
        }
    }

    pub fn close(&mut self) {
        self.current = None;
    }

    /// Step back one item. Crossing the page start flips to the previous
    /// page and lands on its last slot.
    pub fn prev(&mut self) {
        let Some(current) = self.current else {
            return;
        };
        if current == 0 {
            return;
        }
        if current - 1 < self.start() {
            self.page -= 1;
            self.current = Some(self.start() + self.page_size - 1);
        } else {
            self.current = Some(current - 1);
        }
    }

    /// Step forward one item. Crossing the page end flips to the next page
    /// and lands on its first slot.
    pub fn next(&mut self) {
        let Some(current) = self.current else {
            return;
        };
        if current + 1 >= self.len {
            return;
        }
        if current + 1 >= self.end() {
            self.page += 1;
            self.current = Some(self.start());
        } else {
            self.current = Some(current + 1);
        }
    }

    /// Jump to `page` (clamped to the valid range). A fresh page never has an
    /// opened item.
    pub fn change_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages());
        self.current = None;
    }

    /// New page size, e.g. after a viewport change
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.revalidate();
    }

    /// The underlying sequence changed length (filtering, removals)
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        self.revalidate();
    }

    fn revalidate(&mut self) {
        self.page = self.page.clamp(1, self.total_pages());
        if let Some(current) = self.current {
            if current >= self.len || current < self.start() || current >= self.end() {
                self.current = None;
            }
        }
    }
}
