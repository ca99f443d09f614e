use serde::{Deserialize, Serialize};
use std::{collections::HashSet, str::FromStr};

/// Suffix appended by [`ConflictPolicy::Version`]. Constant, so a third
/// colliding tool ends up with the same name as the second.
pub const VERSION_SUFFIX: &str = "_v1";

/// How tools with colliding names are admitted into one load batch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Drop the newcomer.
    Skip,
    /// Name tools `{server}_{tool_id}`; a remaining collision is skipped.
    #[default]
    Prefix,
    /// Evict the earlier holder of the name.
    Replace,
    /// Admit the newcomer as `{tool_id}_v1`.
    Version,
}

impl ConflictPolicy {
    pub fn candidate_name(self, server_name: &str, tool_id: &str) -> String {
        match self {
            Self::Prefix => format!("{server_name}_{tool_id}"),
            Self::Skip | Self::Replace | Self::Version => tool_id.to_string(),
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "prefix" => Ok(Self::Prefix),
            "replace" => Ok(Self::Replace),
            "version" => Ok(Self::Version),
            other => Err(format!(
                "unknown conflict resolution policy '{other}' \
                 (expected skip, prefix, replace or version)"
            )),
        }
    }
}

impl std::fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Skip => "skip",
            Self::Prefix => "prefix",
            Self::Replace => "replace",
            Self::Version => "version",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Admit(String),
    /// Admit under `name` after evicting the tool currently holding it.
    Replace(String),
    Skip(String),
}

/// Batch-wide set of admitted tool names.
#[derive(Debug, Default)]
pub struct NameResolver {
    policy: ConflictPolicy,
    seen: HashSet<String>,
}

impl NameResolver {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            seen: HashSet::new(),
        }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub fn resolve(&mut self, server_name: &str, tool_id: &str) -> Resolution {
        let name = self.policy.candidate_name(server_name, tool_id);
        if self.seen.insert(name.clone()) {
            return Resolution::Admit(name);
        }

        match self.policy {
            ConflictPolicy::Skip | ConflictPolicy::Prefix => {
                tracing::info!(
                    name: "mcp.conflict.skipped",
                    tool = %name,
                    server = %server_name,
                    policy = %self.policy,
                    "Tool name conflict, skipping"
                );
                Resolution::Skip(name)
            }
            ConflictPolicy::Replace => {
                tracing::info!(
                    name: "mcp.conflict.replaced",
                    tool = %name,
                    server = %server_name,
                    "Tool name conflict, replacing earlier tool"
                );
                Resolution::Replace(name)
            }
            ConflictPolicy::Version => {
                let versioned = format!("{name}{VERSION_SUFFIX}");
                if !self.seen.insert(versioned.clone()) {
                    tracing::warn!(
                        name: "mcp.conflict.version_duplicate",
                        tool = %versioned,
                        server = %server_name,
                        "Versioned tool name already taken; admitting duplicate"
                    );
                }
                Resolution::Admit(versioned)
            }
        }
    }
}
