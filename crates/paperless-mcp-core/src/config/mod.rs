//! Configuration
//!
//! Settings are read from an `EnvSource`:
//! - `ProcessEnv`: the real process environment
//! - `MemoryEnv`: In-memory for testing

mod traits;
mod source;
mod settings;

pub use traits::{EnvSource, ConfigError, ConfigResult};
pub use source::{ProcessEnv, MemoryEnv};
pub use settings::{
    Settings, BackendSettings, LogLevel, Transport, TransportSettings, parse_bool,
    ENV_PAPERLESS_URL, ENV_PAPERLESS_TOKEN, ENV_PAPERLESS_VERIFY_SSL, ENV_PAPERLESS_CA_BUNDLE,
    ENV_PAPERLESS_TIMEOUT_SECONDS, ENV_LOG_LEVEL, ENV_LOOKUP_CACHE_TTL_SECONDS,
    ENV_TRANSPORT, ENV_HOST, ENV_PORT, ENV_MOUNT_PATH,
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECONDS, DEFAULT_LOOKUP_CACHE_TTL_SECONDS,
    DEFAULT_HOST, DEFAULT_PORT, DEFAULT_MOUNT_PATH,
};
