use std::io::Write;

use serde::Serialize;

use crate::error::PagerError;
use crate::pager::TablePager;
use crate::render::json::frame_json;
use crate::render::template::TableView;
use crate::render::{RenderBinding, RenderFrame};

/// A pager paired with the single surface it redraws.
///
/// Every mutating call renders exactly once. A render error is returned to
/// the caller after the pager state has already been updated.
#[derive(Debug)]
pub struct BoundTable<T, B> {
    pager: TablePager<T>,
    binding: B,
}

impl<T, B: RenderBinding<T>> BoundTable<T, B> {
    pub fn new(pager: TablePager<T>, binding: B) -> Self {
        Self { pager, binding }
    }

    pub fn set_data(&mut self, records: Vec<T>) -> Result<(), PagerError> {
        self.pager.set_data(records);
        self.refresh()
    }

    pub fn search(&mut self, term: &str) -> Result<(), PagerError> {
        self.pager.search(term);
        self.refresh()
    }

    pub fn go_to_page(&mut self, requested: i64) -> Result<(), PagerError> {
        self.pager.go_to_page(requested);
        self.refresh()
    }

    pub fn next_page(&mut self) -> Result<(), PagerError> {
        self.pager.next_page();
        self.refresh()
    }

    pub fn prev_page(&mut self) -> Result<(), PagerError> {
        self.pager.prev_page();
        self.refresh()
    }

    /// Redraws the current state without changing it.
    pub fn refresh(&mut self) -> Result<(), PagerError> {
        let frame = self.pager.frame();
        self.binding.render(&frame)
    }

    pub fn pager(&self) -> &TablePager<T> {
        &self.pager
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }

    pub fn binding_mut(&mut self) -> &mut B {
        &mut self.binding
    }

    pub fn into_parts(self) -> (TablePager<T>, B) {
        (self.pager, self.binding)
    }
}

/// Writes each frame through a [`TableView`] template.
#[derive(Debug)]
pub struct TemplateBinding<T, W> {
    view: TableView<T>,
    out: W,
}

impl<T, W: Write> TemplateBinding<T, W> {
    pub fn new(view: TableView<T>, out: W) -> Self {
        Self { view, out }
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<T, W: Write> RenderBinding<T> for TemplateBinding<T, W> {
    fn render(&mut self, frame: &RenderFrame<'_, T>) -> Result<(), PagerError> {
        let body = self.view.render(frame)?;
        self.out.write_all(body.as_bytes())?;
        if !body.ends_with('\n') {
            self.out.write_all(b"\n")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Writes each frame as pretty JSON.
#[derive(Debug)]
pub struct JsonBinding<W> {
    out: W,
}

impl<W: Write> JsonBinding<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<T: Serialize, W: Write> RenderBinding<T> for JsonBinding<W> {
    fn render(&mut self, frame: &RenderFrame<'_, T>) -> Result<(), PagerError> {
        let body = frame_json(frame)?;
        writeln!(self.out, "{body}")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pager::{FieldAccessor, PagerStatus};
    use crate::render::ViewFormat;
    use serde::Serialize;

    #[derive(Debug, Clone, Serialize)]
    struct Alert {
        patient: String,
        level: String,
    }

    fn alerts(count: usize) -> Vec<Alert> {
        (0..count)
            .map(|i| Alert {
                patient: format!("patient-{i}"),
                level: if i % 3 == 0 { "critical" } else { "low" }.to_string(),
            })
            .collect()
    }

    #[derive(Default)]
    struct Recorder {
        frames: Vec<(PagerStatus, usize, usize)>,
    }

    impl RenderBinding<Alert> for Recorder {
        fn render(&mut self, frame: &RenderFrame<'_, Alert>) -> Result<(), PagerError> {
            self.frames
                .push((frame.status, frame.page.page_index, frame.page.items.len()));
            Ok(())
        }
    }

    fn bound(page_size: usize) -> BoundTable<Alert, Recorder> {
        let pager = TablePager::configure(page_size, Vec::new()).expect("pager");
        BoundTable::new(pager, Recorder::default())
    }

    #[test]
    fn every_mutation_renders_once() {
        let mut table = bound(2);
        table.set_data(alerts(5)).expect("set_data");
        table.next_page().expect("next");
        table.go_to_page(99).expect("goto");
        table.prev_page().expect("prev");
        table.search("critical").expect("search");
        table.refresh().expect("refresh");

        assert_eq!(
            table.binding().frames,
            vec![
                (PagerStatus::Showing, 0, 2),
                (PagerStatus::Showing, 1, 2),
                (PagerStatus::Showing, 2, 1),
                (PagerStatus::Showing, 1, 2),
                (PagerStatus::Showing, 0, 2),
                (PagerStatus::Showing, 0, 2),
            ]
        );
    }

    #[test]
    fn empty_and_unmatched_states_reach_the_binding() {
        let mut table = bound(2);
        table.set_data(Vec::new()).expect("set_data");
        table.set_data(alerts(3)).expect("set_data");
        table.search("nobody").expect("search");

        let statuses: Vec<PagerStatus> =
            table.binding().frames.iter().map(|frame| frame.0).collect();
        assert_eq!(
            statuses,
            vec![
                PagerStatus::Idle,
                PagerStatus::Showing,
                PagerStatus::NoMatches
            ]
        );
    }

    #[test]
    fn render_errors_surface_after_state_changes() {
        let pager = TablePager::configure(2, Vec::new()).expect("pager");
        let failing = |_: &RenderFrame<'_, Alert>| -> Result<(), PagerError> {
            Err(PagerError::InvalidArgument("surface detached".into()))
        };
        let mut table = BoundTable::new(pager, failing);
        let err = table.set_data(alerts(4)).expect_err("render fails");
        assert!(err.to_string().contains("surface detached"));
        assert_eq!(table.pager().total_filtered(), 4);
    }

    #[test]
    fn template_binding_writes_markdown() {
        let view = TableView::new(
            vec![FieldAccessor::path("patient"), FieldAccessor::path("level")],
            ViewFormat::Markdown,
        );
        let pager = TablePager::configure(2, Vec::new()).expect("pager");
        let mut table = BoundTable::new(pager, TemplateBinding::new(view, Vec::new()));
        table.set_data(alerts(3)).expect("set_data");

        let (_, binding) = table.into_parts();
        let out = String::from_utf8(binding.into_inner()).expect("utf8");
        assert!(out.contains("| patient-0 | critical |"));
        assert!(out.contains("Showing 1-2 of 3 records."));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn json_binding_writes_one_document_per_render() {
        let pager = TablePager::configure(2, Vec::new()).expect("pager");
        let mut table = BoundTable::new(pager, JsonBinding::new(Vec::new()));
        table.set_data(alerts(3)).expect("set_data");
        table.next_page().expect("next");

        let (_, binding) = table.into_parts();
        let out = String::from_utf8(binding.into_inner()).expect("utf8");
        assert_eq!(out.matches("\"status\": \"showing\"").count(), 2);
        assert!(out.contains("\"patient\": \"patient-2\""));
    }
}
