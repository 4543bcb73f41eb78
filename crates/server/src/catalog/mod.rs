//! Session publication rules: slugs, form validation, listing visibility and order.

mod form;
pub mod listing;
mod slug;

pub use form::{SessionDraft, TaxonomyDraft};
pub use slug::{session_slug, slugify};
