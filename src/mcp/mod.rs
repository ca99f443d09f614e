//! Client side of the tool server protocol plus the dynamic tool registry.
//!
//! Remote tool servers speak a small REST convention:
//!
//! - `GET  {base_url}/mcp/v1/health`: liveness, 200 means healthy
//! - `GET  {base_url}/mcp/v1/tools`: JSON array of [`types::ToolDefinition`]
//! - `POST {base_url}/mcp/v1/tools/call`: `{tool_id, parameters}` in,
//!   [`types::CallResponse`] out
//!
//! [`loader::ToolLoader`] discovers tools from every enabled server, resolves
//! name conflicts and hands back [`wrapper::WrappedTool`]s that agents can
//! execute through one interface.

pub mod auth;
pub mod client;
pub mod conflict;
pub mod discovery;
pub mod error;
pub mod health;
mod invoke;
pub mod loader;
pub mod monitor;
pub mod types;
pub mod wrapper;

pub use client::{ClientSettings, McpClient};
pub use conflict::ConflictPolicy;
pub use error::{DiscoveryError, InvocationError, ToolError};
pub use health::{HealthStatus, ServerStatus};
pub use loader::{LoadOptions, LoadOutcome, LoadSummary, ToolLoader};
pub use wrapper::WrappedTool;
