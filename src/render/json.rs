use serde::Serialize;

use crate::error::PagerError;
use crate::pager::PagerStatus;
use crate::render::{PagerControls, RenderFrame};

#[derive(Serialize)]
struct FrameDocument<'a, T> {
    status: PagerStatus,
    search_term: &'a str,
    page_index: usize,
    total_pages: usize,
    total_filtered: usize,
    page_size: usize,
    controls: &'a PagerControls,
    items: &'a [&'a T],
}

pub fn to_pretty<T: Serialize>(value: &T) -> Result<String, PagerError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn frame_json<T: Serialize>(frame: &RenderFrame<'_, T>) -> Result<String, PagerError> {
    to_pretty(&FrameDocument {
        status: frame.status,
        search_term: frame.search_term,
        page_index: frame.page.page_index,
        total_pages: frame.page.total_pages,
        total_filtered: frame.page.total_filtered,
        page_size: frame.page.page_size,
        controls: &frame.controls,
        items: &frame.page.items,
    })
}
