//! Process settings loaded from the environment

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::lookups::CacheConfig;
use super::traits::{ConfigError, ConfigResult, EnvSource};

pub const ENV_PAPERLESS_URL: &str = "PAPERLESS_URL";
pub const ENV_PAPERLESS_TOKEN: &str = "PAPERLESS_TOKEN";
pub const ENV_PAPERLESS_VERIFY_SSL: &str = "PAPERLESS_VERIFY_SSL";
pub const ENV_PAPERLESS_CA_BUNDLE: &str = "PAPERLESS_CA_BUNDLE";
pub const ENV_PAPERLESS_TIMEOUT_SECONDS: &str = "PAPERLESS_TIMEOUT_SECONDS";
pub const ENV_LOG_LEVEL: &str = "MCP_LOG_LEVEL";
pub const ENV_LOOKUP_CACHE_TTL_SECONDS: &str = "MCP_LOOKUP_CACHE_TTL_SECONDS";
pub const ENV_TRANSPORT: &str = "MCP_TRANSPORT";
pub const ENV_HOST: &str = "MCP_HOST";
pub const ENV_PORT: &str = "MCP_PORT";
pub const ENV_MOUNT_PATH: &str = "MCP_MOUNT_PATH";
const ENV_FASTMCP_HOST: &str = "FASTMCP_HOST";
const ENV_FASTMCP_PORT: &str = "FASTMCP_PORT";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 30.0;
pub const DEFAULT_LOOKUP_CACHE_TTL_SECONDS: u64 = 300;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MOUNT_PATH: &str = "/";

/// Connection settings for the document archive
#[derive(Clone)]
pub struct BackendSettings {
    /// Base URL without trailing slash
    pub base_url: String,
    /// API token, sent as `Authorization: Token <token>`
    pub token: String,
    /// Verify the server certificate
    pub verify_tls: bool,
    /// Extra PEM root certificate, only used when `verify_tls` is set
    pub ca_bundle: Option<PathBuf>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl BackendSettings {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            verify_tls: false,
            ca_bundle: None,
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tls(mut self, verify: bool, ca_bundle: Option<PathBuf>) -> Self {
        self.verify_tls = verify;
        self.ca_bundle = ca_bundle;
        self
    }
}

// Hand-written so the token never reaches a log line
impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("verify_tls", &self.verify_tls)
            .field("ca_bundle", &self.ca_bundle)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Log verbosity accepted in `MCP_LOG_LEVEL`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARNING" | "WARN" => Some(LogLevel::Warning),
            "ERROR" => Some(LogLevel::Error),
            "CRITICAL" => Some(LogLevel::Critical),
            _ => None,
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

/// Transport named in `MCP_TRANSPORT`
///
/// Only `Stdio` is served. The network transports are recognized so the
/// binary can say why it fell back instead of ignoring them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Stdio,
    Sse,
    StreamableHttp,
    /// Raw value that matched no known transport
    Unknown(String),
}

impl Transport {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "" | "stdio" => Transport::Stdio,
            "sse" => Transport::Sse,
            "streamable-http" => Transport::StreamableHttp,
            _ => Transport::Unknown(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Transport::Stdio => "stdio",
            Transport::Sse => "sse",
            Transport::StreamableHttp => "streamable-http",
            Transport::Unknown(raw) => raw,
        }
    }
}

/// Where a network transport would listen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    pub mount_path: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            mount_path: DEFAULT_MOUNT_PATH.to_string(),
        }
    }
}

/// Everything the server needs at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: BackendSettings,
    pub cache: CacheConfig,
    pub log_level: LogLevel,
    /// Raw `MCP_LOG_LEVEL` value when it was not recognized
    pub unrecognized_log_level: Option<String>,
    pub transport: TransportSettings,
}

impl Settings {
    /// Load and validate settings from a source
    pub fn load(source: &dyn EnvSource) -> ConfigResult<Self> {
        let base_url = source
            .get_trimmed(ENV_PAPERLESS_URL)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|e| ConfigError::invalid(ENV_PAPERLESS_URL, format!("is not a valid URL: {}", e)))?;

        let token = source
            .get_trimmed(ENV_PAPERLESS_TOKEN)
            .ok_or_else(|| ConfigError::Missing(ENV_PAPERLESS_TOKEN.to_string()))?;

        let verify_tls = parse_bool(source.get(ENV_PAPERLESS_VERIFY_SSL).as_deref(), false);
        let ca_bundle = source.get_trimmed(ENV_PAPERLESS_CA_BUNDLE).map(PathBuf::from);
        let timeout = timeout_from(source)?;

        let backend = BackendSettings::new(base_url, token)
            .with_timeout(timeout)
            .with_tls(verify_tls, ca_bundle);

        let cache = CacheConfig::from_secs(ttl_from(source)?);

        let (log_level, unrecognized_log_level) = match source.get_trimmed(ENV_LOG_LEVEL) {
            None => (LogLevel::default(), None),
            Some(raw) => match LogLevel::parse(&raw) {
                Some(level) => (level, None),
                None => (LogLevel::default(), Some(raw)),
            },
        };

        Ok(Self {
            backend,
            cache,
            log_level,
            unrecognized_log_level,
            transport: transport_from(source)?,
        })
    }
}

fn timeout_from(source: &dyn EnvSource) -> ConfigResult<Duration> {
    let Some(raw) = source.get_trimmed(ENV_PAPERLESS_TIMEOUT_SECONDS) else {
        return Ok(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS));
    };
    let seconds: f64 = raw
        .parse()
        .map_err(|_| ConfigError::invalid(ENV_PAPERLESS_TIMEOUT_SECONDS, "must be a number."))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ConfigError::invalid(
            ENV_PAPERLESS_TIMEOUT_SECONDS,
            "must be greater than zero.",
        ));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| ConfigError::invalid(ENV_PAPERLESS_TIMEOUT_SECONDS, "is too large."))
}

fn transport_from(source: &dyn EnvSource) -> ConfigResult<TransportSettings> {
    let transport = source
        .get_trimmed(ENV_TRANSPORT)
        .map(|raw| Transport::parse(&raw))
        .unwrap_or_default();
    let host = source
        .get_trimmed(ENV_HOST)
        .or_else(|| source.get_trimmed(ENV_FASTMCP_HOST))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = match port_from(source, ENV_PORT)? {
        Some(port) => port,
        None => port_from(source, ENV_FASTMCP_PORT)?.unwrap_or(DEFAULT_PORT),
    };
    let mount_path = source
        .get_trimmed(ENV_MOUNT_PATH)
        .unwrap_or_else(|| DEFAULT_MOUNT_PATH.to_string());

    Ok(TransportSettings {
        transport,
        host,
        port,
        mount_path,
    })
}

fn port_from(source: &dyn EnvSource, var: &str) -> ConfigResult<Option<u16>> {
    source
        .get_trimmed(var)
        .map(|raw| {
            raw.parse::<u16>()
                .map_err(|_| ConfigError::invalid(var, "must be a port number."))
        })
        .transpose()
}

fn ttl_from(source: &dyn EnvSource) -> ConfigResult<u64> {
    let Some(raw) = source.get_trimmed(ENV_LOOKUP_CACHE_TTL_SECONDS) else {
        return Ok(DEFAULT_LOOKUP_CACHE_TTL_SECONDS);
    };
    match raw.parse::<i64>() {
        Ok(ttl) if ttl < 0 => Err(ConfigError::invalid(
            ENV_LOOKUP_CACHE_TTL_SECONDS,
            "must be zero or greater.",
        )),
        Ok(ttl) => Ok(ttl as u64),
        Err(_) => Err(ConfigError::invalid(
            ENV_LOOKUP_CACHE_TTL_SECONDS,
            "must be a whole number of seconds.",
        )),
    }
}

/// Parse a boolean flag; unrecognized values fall back to `default`
pub fn parse_bool(value: Option<&str>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
