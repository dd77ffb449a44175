//! reqwest-based backend client

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Certificate, Client, Url};
use serde_json::Value;

use super::error::{BackendError, BackendResult};
use super::traits::{BackendClient, BackendRequest, MultipartUpload, RequestBody};
use crate::config::BackendSettings;
use crate::logging::Logger;
use crate::{log_debug, log_error};

/// Client for a live document archive
pub struct HttpBackendClient {
    client: Client,
    base_url: String,
    token: String,
    logger: Arc<dyn Logger>,
}

impl HttpBackendClient {
    /// Build a client from connection settings
    pub fn new(settings: &BackendSettings, logger: Arc<dyn Logger>) -> BackendResult<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("paperless-mcp/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(!settings.verify_tls);

        if settings.verify_tls {
            if let Some(path) = &settings.ca_bundle {
                let pem = std::fs::read(path).map_err(|e| {
                    BackendError::Configuration(format!(
                        "failed to read CA bundle {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                let certificate = Certificate::from_pem(&pem).map_err(|e| {
                    BackendError::Configuration(format!("invalid CA bundle {}: {}", path.display(), e))
                })?;
                builder = builder.add_root_certificate(certificate);
            }
        }

        let client = builder
            .build()
            .map_err(|e| BackendError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            logger,
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> BackendResult<Url> {
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&joined)
            .map_err(|e| BackendError::Configuration(format!("invalid URL {}: {}", joined, e)))
    }

    fn multipart_form(upload: MultipartUpload) -> BackendResult<Form> {
        let mut form = Form::new();
        for (key, value) in upload.fields {
            form = form.text(key, value);
        }
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)
            .map_err(|e| BackendError::Internal(format!("invalid MIME type: {}", e)))?;
        Ok(form.part(upload.file_field, part))
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn request(&self, request: BackendRequest) -> BackendResult<Value> {
        let url = self.url(&request.path)?;
        log_debug!(self.logger, "{} {}", request.method, request.path);

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .header(ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            Some(RequestBody::Json(body)) => builder.json(&body),
            Some(RequestBody::Multipart(upload)) => builder.multipart(Self::multipart_form(upload)?),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            log_error!(self.logger, "{} {} failed: {}", request.method, request.path, e);
            BackendError::from_transport(e)
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(BackendError::from_transport)?;
        if !status.is_success() {
            log_error!(self.logger, "{} {} returned HTTP {}", request.method, request.path, status.as_u16());
            return Err(BackendError::status(
                status.as_u16(),
                String::from_utf8_lossy(&bytes),
            ));
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| BackendError::invalid_response(format!("archive returned invalid JSON: {}", e)))
    }
}
