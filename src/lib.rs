#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

//! Client-side table paging and search over in-memory result sets.
//!
//! [`pager::TablePager`] windows and filters records; [`render`] turns its
//! state into a view-model and redraws bound surfaces; [`sources`] loads
//! result sets before they reach a pager.

pub mod cli;
pub mod error;
pub mod pager;
pub mod render;
pub mod sources;
pub mod utils;

pub use error::PagerError;
pub use pager::{FieldAccessor, PagerStatus, SearchPolicy, TablePager, VisiblePage};
pub use render::{BoundTable, PagerControls, RenderBinding, RenderFrame};
