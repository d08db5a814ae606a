//! Utility helpers for JSON record traversal and debounced search input.

pub mod debounce;
pub(crate) mod json;
