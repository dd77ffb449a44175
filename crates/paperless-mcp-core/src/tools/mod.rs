//! Tool surface exposed to MCP callers

mod dispatcher;
mod error;
mod params;

pub use dispatcher::{ToolDispatcher, UPLOAD_FILE_FIELD};
pub use error::{backend_error_payload, ToolError, ToolResult};
pub use params::{
    CreateLookupParams, GetDocumentParams, ListLookupsParams, ListLookupsResponse,
    SearchDocumentsParams, UpdateDocumentParams, UploadDocumentParams, DEFAULT_SEARCH_PAGE_SIZE,
    MAX_SEARCH_PAGE_SIZE,
};
