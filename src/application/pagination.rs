//! Fixed-size page slicing and the compact page-number window.

use serde::{Serialize, Serializer};

/// Posts shown per feed page.
pub const PAGE_SIZE: usize = 30;

/// Window sizes at or below this show every page number.
const FULL_WINDOW_LIMIT: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
}

/// Number of pages needed for `len` items; never less than one.
pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1)).max(1)
}

/// Slices the 1-based `page` out of `items`.
///
/// Pages outside `1..=total_pages` (including 0) yield no items.
pub fn paginate<T: Clone>(items: &[T], page_size: usize, page: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_pages = total_pages(items.len(), page_size);

    let slice = page
        .checked_sub(1)
        .and_then(|index| index.checked_mul(page_size))
        .filter(|start| *start < items.len())
        .map(|start| {
            let end = (start + page_size).min(items.len());
            items[start..end].to_vec()
        })
        .unwrap_or_default();

    Page {
        items: slice,
        page,
        total_pages,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    Page(usize),
    Ellipsis,
}

impl Serialize for PageSlot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PageSlot::Page(number) => serializer.serialize_u64(*number as u64),
            PageSlot::Ellipsis => serializer.serialize_str("..."),
        }
    }
}

/// Page numbers to display around `current`.
///
/// Short ranges list every page. Longer ones keep the first and last page
/// plus the neighbours of `current`, and collapse each gap into one ellipsis.
pub fn page_window(current: usize, total: usize) -> Vec<PageSlot> {
    let total = total.max(1);
    if total <= FULL_WINDOW_LIMIT {
        return (1..=total).map(PageSlot::Page).collect();
    }

    let current = current.clamp(1, total);
    let mut slots = Vec::new();
    let mut previous: Option<usize> = None;

    for number in 1..=total {
        let shown = number == 1 || number == total || number.abs_diff(current) <= 1;
        if !shown {
            continue;
        }
        if let Some(previous) = previous
            && number - previous > 1
        {
            slots.push(PageSlot::Ellipsis);
        }
        slots.push(PageSlot::Page(number));
        previous = Some(number);
    }

    slots
}
