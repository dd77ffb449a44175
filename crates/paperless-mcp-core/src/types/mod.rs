//! Core types for archive interactions
//!
//! This module contains the shared types used across the cache, backend and tools.

mod lookup;
mod document;

pub use lookup::{
    LookupCategory, LookupRecord, UnknownLookupType,
    normalize_matching_algorithm, MATCHING_ALGORITHM_AUTO,
};
pub use document::{DocumentSummary, SearchPage, metadata_form_fields};
pub(crate) use document::scalar_to_string;
