use super::ServerRecord;
use anyhow::{Context, bail};
use serde::Deserialize;
use std::{fs, path::Path};
use url::Url;

/// On-disk server list. YAML, so plain JSON files are accepted too.
///
/// ```yaml
/// servers:
///   - name: search
///     base_url: http://localhost:8101
///     auth:
///       type: bearer_token
///       token: ${SEARCH_TOKEN}
/// ```
#[derive(Debug, Deserialize)]
pub struct ServersFile {
    #[serde(default)]
    pub servers: Vec<ServerRecord>,
}

pub fn load_servers_file(path: impl AsRef<Path>) -> anyhow::Result<Vec<ServerRecord>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read servers file {}", path.display()))?;
    parse_servers(&expand_env_placeholders(&raw))
        .with_context(|| format!("invalid servers file {}", path.display()))
}

pub fn parse_servers(text: &str) -> anyhow::Result<Vec<ServerRecord>> {
    let file: ServersFile = serde_yaml::from_str(text)?;
    for server in &file.servers {
        if server.name.trim().is_empty() {
            bail!("server name must not be empty");
        }
        let url = Url::parse(&server.base_url)
            .with_context(|| format!("invalid base_url for server '{}'", server.name))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "server '{}' base_url must be http(s), got '{}'",
                server.name,
                url.scheme()
            );
        }
    }
    Ok(file.servers)
}

/// Expand `${NAME}` placeholders from the process environment.
/// Unset variables leave the placeholder untouched.
pub fn expand_env_placeholders(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match std::env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => {
                tracing::warn!(variable = %name, "servers file references unset variable");
                out.push_str(&rest[start..start + 2 + end + 1]);
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
