//! Search policies: which text of a record a search term is matched against.

use std::fmt;

use serde::Serialize;

use crate::utils::json::{leaf_text, resolve_path};

type Accessor<T> = Box<dyn Fn(&T) -> Option<String> + Send + Sync>;
type TextFn<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

/// A named way of reading one piece of text out of a record.
///
/// Used both as a search field and as a rendered table column.
pub struct FieldAccessor<T> {
    name: String,
    accessor: Accessor<T>,
}

impl<T> FieldAccessor<T> {
    pub fn new<F>(name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            accessor: Box::new(accessor),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self, record: &T) -> Option<String> {
        (self.accessor)(record)
    }
}

impl<T: Serialize + 'static> FieldAccessor<T> {
    /// Resolves a dotted path (`customer.name`, `items.0.code`) against the
    /// record's JSON form. Missing and null values yield `None`.
    pub fn path(path: &str) -> Self {
        let name = path.trim().to_string();
        let segments: Vec<String> = name
            .split('.')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(name, move |record: &T| {
            let value = serde_json::to_value(record).ok()?;
            resolve_path(&value, &segments).and_then(leaf_text)
        })
    }
}

impl<T> fmt::Debug for FieldAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

pub enum SearchPolicy<T> {
    /// A record matches when any field contains the term.
    /// An empty list matches nothing once a term is set.
    Fields(Vec<FieldAccessor<T>>),
    /// A record matches when its full text contains the term.
    WholeRecord(TextFn<T>),
}

impl<T> SearchPolicy<T> {
    /// Whole-record matching over caller-provided text, for records that are
    /// not `Serialize` (e.g. pre-rendered row strings).
    pub fn text<F>(text: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self::WholeRecord(Box::new(text))
    }

    /// `term` must already be normalized and non-empty.
    pub(crate) fn matches(&self, record: &T, term: &str) -> bool {
        match self {
            Self::Fields(fields) => fields
                .iter()
                .filter_map(|field| field.value(record))
                .any(|value| contains_folded(&value, term)),
            Self::WholeRecord(text) => contains_folded(&text(record), term),
        }
    }
}

impl<T: Serialize + 'static> SearchPolicy<T> {
    /// Matches against every scalar value of the record, keys excluded.
    pub fn whole_record() -> Self {
        Self::text(|record: &T| {
            serde_json::to_value(record)
                .ok()
                .and_then(|value| leaf_text(&value))
                .unwrap_or_default()
        })
    }

    /// Field search, falling back to whole-record search when `fields` is empty.
    pub fn from_fields(fields: Vec<FieldAccessor<T>>) -> Self {
        if fields.is_empty() {
            Self::whole_record()
        } else {
            Self::Fields(fields)
        }
    }
}

impl<T> fmt::Debug for SearchPolicy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fields(fields) => f.debug_tuple("Fields").field(fields).finish(),
            Self::WholeRecord(_) => f.write_str("WholeRecord"),
        }
    }
}

/// Trims and lower-cases a raw search input. A blank result means "no filter".
pub fn normalize_term(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn contains_folded(haystack: &str, term: &str) -> bool {
    haystack.to_lowercase().contains(term)
}
