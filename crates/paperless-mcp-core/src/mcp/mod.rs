//! MCP (Model Context Protocol) server
//!
//! Uses the official rmcp SDK. Tools are routed with `#[tool_router]` and
//! served over stdio.

mod server;

pub use server::{PaperlessServer, ServerError, ServerResult};
