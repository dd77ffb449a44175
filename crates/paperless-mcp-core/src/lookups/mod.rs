//! Lookup lists (tags, document types, correspondents, storage paths, custom fields)
//!
//! - `LookupFetcher`: pulls a complete category from the archive
//! - `LookupCache`: TTL cache with per-category single-flight fetches
//! - `project`: field selection on the way out

mod cache;
mod fetcher;
mod projection;

pub use cache::{CacheConfig, CachedLookup, LookupCache, LookupFetchError, LookupFetchResult};
pub use fetcher::{LookupFetcher, LOOKUP_PAGE_SIZE, MAX_LOOKUP_PAGES};
pub use projection::{normalize_fields, project};
