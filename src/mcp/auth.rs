use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Credential material attached to every request sent to one tool server.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    #[default]
    None,
    ApiKey {
        key: String,
        #[serde(default = "default_api_key_header")]
        header_name: String,
    },
    BearerToken {
        token: String,
    },
    BasicAuth {
        username: String,
        password: String,
    },
}

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::ApiKey { header_name, .. } => f
                .debug_struct("ApiKey")
                .field("header_name", header_name)
                .finish_non_exhaustive(),
            Self::BearerToken { .. } => f.debug_struct("BearerToken").finish_non_exhaustive(),
            Self::BasicAuth { username, .. } => f
                .debug_struct("BasicAuth")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

impl AuthConfig {
    /// Build request headers for this credential.
    ///
    /// Values that cannot be represented as HTTP header values are dropped
    /// with a warning rather than failing the request.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match self {
            Self::None => {}
            Self::ApiKey { key, header_name } => {
                match (
                    HeaderName::from_bytes(header_name.as_bytes()),
                    HeaderValue::from_str(key),
                ) {
                    (Ok(name), Ok(mut value)) => {
                        value.set_sensitive(true);
                        headers.insert(name, value);
                    }
                    _ => tracing::warn!(header = %header_name, "invalid API key header, skipping"),
                }
            }
            Self::BearerToken { token } => {
                insert_authorization(&mut headers, &format!("Bearer {token}"));
            }
            Self::BasicAuth { username, password } => {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                insert_authorization(&mut headers, &format!("Basic {encoded}"));
            }
        }
        headers
    }
}

fn insert_authorization(headers: &mut HeaderMap, raw: &str) {
    match HeaderValue::from_str(raw) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Err(_) => tracing::warn!("invalid authorization header value, skipping"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_uses_default_header_name() {
        let auth: AuthConfig =
            serde_json::from_str(r#"{"type":"api_key","key":"secret"}"#).unwrap();
        let headers = auth.headers();
        assert_eq!(headers.get("x-api-key").unwrap(), "secret");
    }

    #[test]
    fn bearer_and_basic_headers() {
        let bearer = AuthConfig::BearerToken {
            token: "abc".into(),
        };
        assert_eq!(bearer.headers().get(AUTHORIZATION).unwrap(), "Bearer abc");

        let basic = AuthConfig::BasicAuth {
            username: "user".into(),
            password: "pass".into(),
        };
        assert_eq!(
            basic.headers().get(AUTHORIZATION).unwrap(),
            "Basic dXNlcjpwYXNz"
        );
    }

    #[test]
    fn debug_hides_secrets() {
        let auth = AuthConfig::BasicAuth {
            username: "user".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{auth:?}").contains("hunter2"));
    }
}
