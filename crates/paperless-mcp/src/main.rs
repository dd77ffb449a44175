//! paperless-mcp
//!
//! MCP server for a Paperless-ngx document archive. Configuration comes from
//! the environment (`PAPERLESS_URL`, `PAPERLESS_TOKEN`, ...); the MCP stream
//! runs over stdin/stdout and logs go to stderr.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use paperless_mcp_core::config::{Transport, ENV_LOG_LEVEL, ENV_TRANSPORT};
use paperless_mcp_core::{
    HttpBackendClient, LookupCache, LookupFetcher, Logger, PaperlessServer, ProcessEnv, Settings,
    ToolDispatcher, TracingLogger,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load(&ProcessEnv::new()).context("invalid configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_directive()));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Some(raw) = &settings.unrecognized_log_level {
        tracing::warn!("Unknown {} '{}', defaulting to INFO.", ENV_LOG_LEVEL, raw);
    }
    match &settings.transport.transport {
        Transport::Stdio => {}
        Transport::Unknown(raw) => {
            tracing::warn!("Invalid {}={:?}. Falling back to stdio.", ENV_TRANSPORT, raw);
        }
        other => {
            tracing::warn!(
                host = %settings.transport.host,
                port = settings.transport.port,
                mount_path = %settings.transport.mount_path,
                "{}={} is not served by this build. Falling back to stdio.",
                ENV_TRANSPORT,
                other.as_str()
            );
        }
    }
    tracing::info!(
        base_url = %settings.backend.base_url,
        verify_tls = settings.backend.verify_tls,
        cache_ttl_seconds = settings.cache.ttl().as_secs(),
        "starting paperless-mcp"
    );

    let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new());
    let backend = Arc::new(
        HttpBackendClient::new(&settings.backend, Arc::new(TracingLogger::for_component("backend")))
            .context("failed to build archive client")?,
    );
    let fetcher = LookupFetcher::new(backend.clone(), Arc::new(TracingLogger::for_component("lookups")));
    let cache = LookupCache::new(fetcher, settings.cache, Arc::new(TracingLogger::for_component("lookup_cache")));
    let dispatcher = ToolDispatcher::new(backend, cache, logger);

    PaperlessServer::new(dispatcher)
        .serve_stdio()
        .await
        .context("MCP server failed")?;

    tracing::info!("paperless-mcp stopped");
    Ok(())
}
