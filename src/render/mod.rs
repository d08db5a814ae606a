//! View-model and render bindings for paged tables.

use serde::Serialize;

use crate::error::PagerError;
use crate::pager::{PagerStatus, TablePager, VisiblePage};

pub mod binding;
pub mod json;
pub mod template;

pub use binding::{BoundTable, JsonBinding, TemplateBinding};
pub use template::{TableView, ViewFormat};

/// State of the previous/next/page-count control group plus the range label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagerControls {
    /// False when every filtered record fits on one page; the whole group is
    /// hidden then, not merely disabled.
    pub visible: bool,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    /// One-based.
    pub page_number: usize,
    pub total_pages: usize,
    pub label: String,
}

impl PagerControls {
    pub fn for_page<T>(page: &VisiblePage<'_, T>) -> Self {
        let visible = page.total_filtered > page.page_size;
        Self {
            visible,
            prev_enabled: visible && page.page_index > 0,
            next_enabled: visible && page.page_index + 1 < page.total_pages,
            page_number: page.page_index + 1,
            total_pages: page.total_pages,
            label: range_label(page.offset(), page.items.len(), page.total_filtered),
        }
    }
}

fn range_label(offset: usize, returned: usize, total: usize) -> String {
    if returned == 0 {
        return format!("Showing 0 of {total} records.");
    }
    let start = offset.saturating_add(1);
    let end = offset.saturating_add(returned);
    if start == end {
        format!("Showing {end} of {total} records.")
    } else {
        format!("Showing {start}-{end} of {total} records.")
    }
}

/// Everything a binding needs to redraw one table.
#[derive(Debug, Clone)]
pub struct RenderFrame<'a, T> {
    pub page: VisiblePage<'a, T>,
    pub status: PagerStatus,
    pub search_term: &'a str,
    pub controls: PagerControls,
}

impl<T> TablePager<T> {
    pub fn frame(&self) -> RenderFrame<'_, T> {
        let page = self.visible_page();
        let controls = PagerControls::for_page(&page);
        RenderFrame {
            page,
            status: self.status(),
            search_term: self.search_term(),
            controls,
        }
    }
}

/// A destination surface for one table.
pub trait RenderBinding<T> {
    fn render(&mut self, frame: &RenderFrame<'_, T>) -> Result<(), PagerError>;
}

impl<T, F> RenderBinding<T> for F
where
    F: FnMut(&RenderFrame<'_, T>) -> Result<(), PagerError>,
{
    fn render(&mut self, frame: &RenderFrame<'_, T>) -> Result<(), PagerError> {
        self(frame)
    }
}
