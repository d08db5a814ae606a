use std::fmt;
use std::sync::OnceLock;

use minijinja::{AutoEscape, Environment, context};

use crate::error::PagerError;
use crate::pager::FieldAccessor;
use crate::render::RenderFrame;

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

const MARKDOWN_TEMPLATE: &str = "table.md.j2";
const HTML_TEMPLATE: &str = "table.html.j2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewFormat {
    Markdown,
    Html,
}

impl ViewFormat {
    fn template_name(self) -> &'static str {
        match self {
            Self::Markdown => MARKDOWN_TEMPLATE,
            Self::Html => HTML_TEMPLATE,
        }
    }
}

fn cell_text(value: &str) -> String {
    value
        .trim()
        .split('\n')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn env() -> Result<&'static Environment<'static>, PagerError> {
    if let Some(env) = ENV.get() {
        return Ok(env);
    }

    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_auto_escape_callback(|name| {
        if name.ends_with(".html.j2") {
            AutoEscape::Html
        } else {
            AutoEscape::None
        }
    });
    env.add_filter("cell", |value: String| -> String { cell_text(&value) });
    env.add_filter("md_cell", |value: String| -> String {
        cell_text(&value).replace('|', "\\|")
    });
    env.add_template(
        MARKDOWN_TEMPLATE,
        include_str!("../../templates/table.md.j2"),
    )?;
    env.add_template(
        HTML_TEMPLATE,
        include_str!("../../templates/table.html.j2"),
    )?;

    let _ = ENV.set(env);
    ENV.get().ok_or_else(|| PagerError::InvalidArgument("template environment unavailable".into()))
}

/// Declarative table rendering: column accessors plus an output format.
pub struct TableView<T> {
    columns: Vec<FieldAccessor<T>>,
    format: ViewFormat,
    title: Option<String>,
}

impl<T> TableView<T> {
    pub fn new(columns: Vec<FieldAccessor<T>>, format: ViewFormat) -> Self {
        Self {
            columns,
            format,
            title: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn format(&self) -> ViewFormat {
        self.format
    }

    pub fn render(&self, frame: &RenderFrame<'_, T>) -> Result<String, PagerError> {
        let headers: Vec<&str> = self.columns.iter().map(FieldAccessor::name).collect();
        let rows: Vec<Vec<String>> = frame
            .page
            .items
            .iter()
            .map(|record| {
                self.columns
                    .iter()
                    .map(|column| column.value(record).unwrap_or_default())
                    .collect()
            })
            .collect();

        let tmpl = env()?.get_template(self.format.template_name())?;
        let body = tmpl.render(context! {
            title => self.title.as_deref(),
            headers => headers,
            rows => rows,
            first_number => frame.page.offset() + 1,
            status => frame.status,
            search_term => frame.search_term,
            controls => &frame.controls,
        })?;
        Ok(body)
    }
}

impl<T> fmt::Debug for TableView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableView")
            .field("columns", &self.columns)
            .field("format", &self.format)
            .field("title", &self.title)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pager::TablePager;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Hospital {
        name: String,
        city: String,
    }

    fn hospital(name: &str, city: &str) -> Hospital {
        Hospital {
            name: name.to_string(),
            city: city.to_string(),
        }
    }

    fn view(format: ViewFormat) -> TableView<Hospital> {
        TableView::new(
            vec![FieldAccessor::path("name"), FieldAccessor::path("city")],
            format,
        )
    }

    fn pager(records: Vec<Hospital>, page_size: usize) -> TablePager<Hospital> {
        let mut pager = TablePager::configure(page_size, Vec::new()).expect("pager");
        pager.set_data(records);
        pager
    }

    #[test]
    fn cell_text_flattens_multi_value_fields() {
        assert_eq!(cell_text(" a\nb \n\n c "), "a, b, c");
        assert_eq!(cell_text(""), "");
    }

    #[test]
    fn markdown_table_numbers_rows_from_the_page_offset() {
        let mut pager = pager(
            (0..5).map(|i| hospital(&format!("H{i}"), "Lyon")).collect(),
            2,
        );
        pager.go_to_page(1);
        let out = view(ViewFormat::Markdown)
            .with_title("Hospitals")
            .render(&pager.frame())
            .expect("render");

        assert!(out.contains("## Hospitals"));
        assert!(out.contains("| # | name | city |"));
        assert!(out.contains("| 3 | H2 | Lyon |"));
        assert!(out.contains("| 4 | H3 | Lyon |"));
        assert!(!out.contains("H4"));
        assert!(out.contains("Showing 3-4 of 5 records."));
        assert!(out.contains("Page 2 of 3"));
    }

    #[test]
    fn markdown_escapes_pipes_in_cells() {
        let pager = pager(vec![hospital("A | B", "Nice")], 6);
        let out = view(ViewFormat::Markdown)
            .render(&pager.frame())
            .expect("render");
        assert!(out.contains("A \\| B"));
    }

    #[test]
    fn markdown_hides_page_controls_when_single_page() {
        let pager = pager(vec![hospital("A", "Nice"), hospital("B", "Nice")], 6);
        let out = view(ViewFormat::Markdown)
            .render(&pager.frame())
            .expect("render");
        assert!(out.contains("Showing 1-2 of 2 records."));
        assert!(!out.contains("Page 1 of 1"));
    }

    #[test]
    fn empty_states_are_distinguished() {
        let idle = pager(Vec::new(), 6);
        let out = view(ViewFormat::Markdown)
            .render(&idle.frame())
            .expect("render");
        assert!(out.contains("No records loaded."));

        let mut unmatched = pager(vec![hospital("A", "Nice")], 6);
        unmatched.search("Paris");
        let out = view(ViewFormat::Markdown)
            .render(&unmatched.frame())
            .expect("render");
        assert!(out.contains("No records match \"paris\"."));
        assert!(!out.contains("No records loaded."));
    }

    #[test]
    fn markdown_title_and_search_term_stay_on_one_line() {
        let mut pager = pager(vec![hospital("A", "Nice"), hospital("B", "Nice")], 6);
        pager.search("ni\nce");
        let out = view(ViewFormat::Markdown)
            .with_title("Hospitals\n# Injected")
            .render(&pager.frame())
            .expect("render");

        assert!(out.contains("## Hospitals, # Injected"));
        assert!(!out.contains("\n# Injected"));
        assert!(out.contains("No records match \"ni, ce\"."));
    }

    #[test]
    fn html_output_escapes_record_values() {
        let pager = pager(vec![hospital("<script>alert(1)</script>", "Nice & Co")], 6);
        let out = view(ViewFormat::Html).render(&pager.frame()).expect("render");

        assert!(out.contains("&lt;script&gt;"));
        assert!(!out.contains("<script>"));
        assert!(out.contains("Nice &amp; Co"));
        assert!(out.contains("<th>name</th>"));
        assert!(out.contains("data-status=\"showing\""));
    }

    #[test]
    fn html_controls_disable_unavailable_directions() {
        let pager = pager(
            (0..9).map(|i| hospital(&format!("H{i}"), "Lyon")).collect(),
            6,
        );
        let out = view(ViewFormat::Html).render(&pager.frame()).expect("render");
        assert!(out.contains("<button data-page=\"prev\" disabled>Previous</button>"));
        assert!(out.contains("<button data-page=\"next\">Next</button>"));
        assert!(out.contains("Page 1 of 2"));
    }

    #[test]
    fn html_escapes_search_term_in_empty_state() {
        let mut pager = pager(vec![hospital("A", "Nice")], 6);
        pager.search("<b>");
        let out = view(ViewFormat::Html).render(&pager.frame()).expect("render");
        assert!(out.contains("&lt;b&gt;"));
        assert!(!out.contains("<b>"));
    }
}
