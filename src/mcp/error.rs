//! Error types for discovery, invocation and wrapped tool execution.

use serde::Serialize;
use thiserror::Error;

/// Discovery failed for a whole server.
///
/// Individual malformed catalog entries never produce this error; they are
/// skipped and reported in [`crate::mcp::discovery::ToolCatalog::rejected`].
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Every attempt failed with a transport error or non-2xx status.
    #[error("tool discovery for {server_url} failed after {attempts} attempt(s): {message}")]
    Exhausted {
        server_url: String,
        attempts: u32,
        status: Option<u16>,
        body_snippet: Option<String>,
        message: String,
    },

    /// The server answered 2xx with something other than a JSON array.
    #[error("protocol violation from {server_url}: {message}")]
    Protocol {
        server_url: String,
        status: u16,
        body_snippet: String,
        message: String,
    },
}

impl DiscoveryError {
    pub fn server_url(&self) -> &str {
        match self {
            Self::Exhausted { server_url, .. } | Self::Protocol { server_url, .. } => server_url,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Exhausted { status, .. } => *status,
            Self::Protocol { status, .. } => Some(*status),
        }
    }
}

/// A single tool call could not produce a [`crate::mcp::types::CallResponse`].
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("tool call to {server_url} failed: {message}")]
    Transport { server_url: String, message: String },

    #[error("tool call to {server_url} returned HTTP {status}: {body}")]
    Http {
        server_url: String,
        status: u16,
        body: String,
    },

    #[error("malformed tool call response from {server_url}: {message}")]
    MalformedResponse {
        server_url: String,
        status: u16,
        message: String,
    },
}

impl InvocationError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { .. } => None,
            Self::Http { status, .. } | Self::MalformedResponse { status, .. } => Some(*status),
        }
    }

    /// Stable variant name, reported in [`ToolErrorDetails::error_type`].
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "Transport",
            Self::Http { .. } => "Http",
            Self::MalformedResponse { .. } => "MalformedResponse",
        }
    }
}

/// Context attached to a failed wrapped tool execution.
#[derive(Debug, Clone, Serialize)]
pub struct ToolErrorDetails {
    pub server_name: String,
    pub original_tool_id: String,
    pub server_url: String,
    pub consecutive_failures: u32,
    pub execution_time_ms: f64,
    pub error_type: String,
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown tool: '{name}'")]
    UnknownTool { name: String },

    #[error("tool '{tool}' has no transport client")]
    Unavailable { tool: String },

    #[error("server '{server_name}' is unavailable ({consecutive_failures} consecutive failures)")]
    CircuitOpen {
        server_name: String,
        server_url: String,
        consecutive_failures: u32,
    },

    #[error("tool '{tool}' failed: {source}")]
    Execution {
        tool: String,
        details: ToolErrorDetails,
        #[source]
        source: InvocationError,
    },

    #[error("native tool '{tool}' failed: {message}")]
    Native { tool: String, message: String },
}

impl ToolError {
    pub fn details(&self) -> Option<&ToolErrorDetails> {
        match self {
            Self::Execution { details, .. } => Some(details),
            _ => None,
        }
    }
}
