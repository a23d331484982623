//! Change tracking over the Document Model
//!
//! - [`extract_changes`] derives the flat list of pending edits shown in the
//!   changes sidebar.
//! - [`accept`] / [`reject`] record a decision on every mark of one change.
//! - [`consolidate`] resolves decided marks into final content. It runs on a
//!   copy before every save; the live editable tree keeps its decorations.

mod consolidate;
mod extract;
mod resolve;


pub use consolidate::consolidate;
pub use extract::{extract_changes, Change};
pub use resolve::{accept, reject, resolve};
