//! MCP server exposing the archive tools

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;
use thiserror::Error;

use crate::tools::{
    CreateLookupParams, GetDocumentParams, ListLookupsParams, SearchDocumentsParams,
    ToolDispatcher, ToolResult, UpdateDocumentParams, UploadDocumentParams,
};

const INSTRUCTIONS: &str = "Paperless-ngx document archive. Use 'search_documents' to find \
documents, 'get_document' for full records, 'upload_document' and 'update_document' to change \
the archive, 'list_lookups' to resolve tag, correspondent, document type, storage path and \
custom field IDs, and 'create_lookup' to add new ones.";

/// Errors running the server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to start MCP service: {0}")]
    Start(String),

    #[error("MCP service stopped with an error: {0}")]
    Stopped(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// MCP handler delegating every tool to a `ToolDispatcher`
#[derive(Clone)]
pub struct PaperlessServer {
    dispatcher: ToolDispatcher,
    tool_router: ToolRouter<Self>,
}

impl PaperlessServer {
    pub fn new(dispatcher: ToolDispatcher) -> Self {
        Self {
            dispatcher,
            tool_router: Self::tool_router(),
        }
    }

    /// Serve over stdin/stdout until the client disconnects
    pub async fn serve_stdio(self) -> ServerResult<()> {
        let service = self
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|e| ServerError::Start(e.to_string()))?;
        service
            .waiting()
            .await
            .map_err(|e| ServerError::Stopped(e.to_string()))?;
        Ok(())
    }
}

#[tool_router]
impl PaperlessServer {
    #[tool(description = "Return service status for basic connectivity checks. Returns \"ok\".")]
    async fn healthcheck(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(
            self.dispatcher.healthcheck(),
        )]))
    }

    #[tool(
        description = "Search documents by text query and optional filters. Returns count, next, previous and compact document summaries."
    )]
    async fn search_documents(
        &self,
        Parameters(params): Parameters<SearchDocumentsParams>,
    ) -> Result<CallToolResult, McpError> {
        into_call_result(self.dispatcher.search_documents(params).await)
    }

    #[tool(description = "Fetch a single document by its numeric ID.")]
    async fn get_document(
        &self,
        Parameters(params): Parameters<GetDocumentParams>,
    ) -> Result<CallToolResult, McpError> {
        into_call_result(self.dispatcher.get_document(params.document_id).await)
    }

    #[tool(
        description = "Upload a file from the server's disk with optional metadata. Returns the archive's acknowledgement (usually a task ID)."
    )]
    async fn upload_document(
        &self,
        Parameters(params): Parameters<UploadDocumentParams>,
    ) -> Result<CallToolResult, McpError> {
        into_call_result(self.dispatcher.upload_document(params).await)
    }

    #[tool(description = "Update the given fields of a document. Returns the updated document.")]
    async fn update_document(
        &self,
        Parameters(params): Parameters<UpdateDocumentParams>,
    ) -> Result<CallToolResult, McpError> {
        into_call_result(self.dispatcher.update_document(params).await)
    }

    #[tool(
        description = "Create a tag, document type, correspondent, storage path or custom field. Matching defaults to auto unless auto_match is false."
    )]
    async fn create_lookup(
        &self,
        Parameters(params): Parameters<CreateLookupParams>,
    ) -> Result<CallToolResult, McpError> {
        into_call_result(self.dispatcher.create_lookup(params).await)
    }

    #[tool(
        description = "List tags, document types, correspondents, storage paths and custom fields, with per-list counts and errors. Served from a cache unless refresh is true."
    )]
    async fn list_lookups(
        &self,
        Parameters(params): Parameters<ListLookupsParams>,
    ) -> Result<CallToolResult, McpError> {
        into_call_result(self.dispatcher.list_lookups(params).await)
    }
}

#[tool_handler]
impl ServerHandler for PaperlessServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Validation failures become `invalid_params`; everything else is a tool
/// result flagged as an error, carrying the error payload.
fn into_call_result<T: Serialize>(result: ToolResult<T>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(value) => {
            let text = serde_json::to_string_pretty(&value)
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            Ok(CallToolResult::success(vec![Content::text(text)]))
        }
        Err(e) if e.is_validation() => Err(McpError::invalid_params(e.to_string(), Some(e.to_payload()))),
        Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_payload().to_string())])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::backend::{BackendError, MockBackend};
    use crate::logging::{Logger, NoOpLogger};
    use crate::lookups::{CacheConfig, LookupCache, LookupFetcher};
    use crate::tools::ToolError;
    use reqwest::Method;
    use serde_json::json;

    fn server(backend: Arc<MockBackend>) -> PaperlessServer {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());
        let fetcher = LookupFetcher::new(backend.clone(), logger.clone());
        let cache = LookupCache::new(fetcher, CacheConfig::default(), logger.clone());
        PaperlessServer::new(ToolDispatcher::new(backend, cache, logger))
    }

    #[test]
    fn test_all_tools_registered() {
        let server = server(Arc::new(MockBackend::new()));
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "create_lookup",
                "get_document",
                "healthcheck",
                "list_lookups",
                "search_documents",
                "update_document",
                "upload_document",
            ]
        );
    }

    #[test]
    fn test_server_info_enables_tools() {
        let info = server(Arc::new(MockBackend::new())).get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.is_some());
    }

    #[test]
    fn test_validation_error_is_invalid_params() {
        let result: ToolResult<()> = Err(ToolError::validation("page must be 1 or greater."));
        assert!(into_call_result(result).is_err());
    }

    #[test]
    fn test_backend_error_is_error_result() {
        let result: ToolResult<()> = Err(ToolError::backend(
            "get_document",
            BackendError::status(404, "missing"),
        ));
        let call = into_call_result(result).unwrap();
        assert_eq!(call.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_tool_success_result() {
        let backend = Arc::new(MockBackend::new());
        backend.set_reply(Method::GET, "/api/documents/3/", json!({"id": 3}));
        let server = server(backend);

        let call = server
            .get_document(Parameters(GetDocumentParams { document_id: 3 }))
            .await
            .unwrap();
        assert_ne!(call.is_error, Some(true));

        let health = server.healthcheck().await.unwrap();
        assert_ne!(health.is_error, Some(true));
    }
}
