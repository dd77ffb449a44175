//! Paperless MCP Core
//!
//! Tools for a Paperless-ngx document archive, served over MCP.
//! This crate holds everything except process startup, so it can be embedded
//! or tested without a live archive.
//!
//! ## Lookup cache
//!
//! Taxonomy lists (tags, document types, correspondents, storage paths,
//! custom fields) are cached per category with a TTL. Concurrent reads of a
//! category share one fetch, `refresh` bypasses freshness, and creating an
//! entry invalidates its category.
//!
//! ```rust,ignore
//! use paperless_mcp_core::{LookupCache, LookupFetcher, CacheConfig, LookupCategory};
//!
//! let fetcher = LookupFetcher::new(backend, logger.clone());
//! let cache = LookupCache::new(fetcher, CacheConfig::from_secs(300), logger);
//!
//! let results = cache.get([LookupCategory::Tag, LookupCategory::Correspondent], false).await;
//! for (category, result) in results {
//!     match result {
//!         Ok(lookup) => println!("{}: {} entries", category, lookup.records.len()),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod backend;
pub mod lookups;
pub mod tools;
pub mod mcp;

// Re-export commonly used types
pub use types::{LookupCategory, LookupRecord, DocumentSummary, SearchPage};

pub use logging::{Level, Logger, MemoryLogger, NoOpLogger, TracingLogger};

pub use config::{ConfigError, ConfigResult, EnvSource, MemoryEnv, ProcessEnv, Settings, LogLevel};

pub use backend::{
    BackendClient, BackendError, BackendRequest, BackendResult,
    HttpBackendClient, MockBackend,
};

pub use lookups::{CacheConfig, CachedLookup, LookupCache, LookupFetchError, LookupFetcher};

pub use tools::{ToolDispatcher, ToolError, ToolResult};

pub use mcp::{PaperlessServer, ServerError};
