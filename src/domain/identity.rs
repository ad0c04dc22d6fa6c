//! Client identity used as the throttling key.

use std::fmt;

/// Number of token characters kept in a credential-derived key.
pub const CREDENTIAL_PREFIX_LEN: usize = 20;

/// Sentinel address used when a request carries no address headers.
pub const UNKNOWN_ADDRESS: &str = "unknown";

const BEARER_SCHEME: &str = "Bearer ";

/// Header values relevant to identifying a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    /// `Authorization` header
    pub authorization: Option<String>,
    /// `X-Forwarded-For` header, a comma-separated address list
    pub forwarded_for: Option<String>,
    /// `X-Real-IP` header
    pub real_ip: Option<String>,
}

impl RequestMetadata {
    /// Metadata with no headers set. Resolves to the unknown address.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `Authorization` header, e.g. `Bearer <token>`.
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    /// Set `X-Forwarded-For`. Only the first listed address is used.
    pub fn with_forwarded_for(mut self, value: impl Into<String>) -> Self {
        self.forwarded_for = Some(value.into());
        self
    }

    /// Set `X-Real-IP`, consulted when `X-Forwarded-For` is absent.
    pub fn with_real_ip(mut self, value: impl Into<String>) -> Self {
        self.real_ip = Some(value.into());
        self
    }
}

/// Stable key identifying the client behind a request.
///
/// Authenticated clients are keyed by a prefix of their bearer token so full
/// credentials never end up as map keys. Anonymous clients are keyed by
/// address.
///
/// # Example
/// ```
/// use doc_throttle::{ClientIdentity, RequestMetadata};
///
/// let meta = RequestMetadata::new().with_forwarded_for("10.0.0.1, 172.16.0.2");
/// assert_eq!(ClientIdentity::resolve(&meta).as_str(), "ip:10.0.0.1");
///
/// let meta = RequestMetadata::new();
/// assert_eq!(ClientIdentity::resolve(&meta).as_str(), "ip:unknown");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Derive the identity for a request. Never fails.
    pub fn resolve(meta: &RequestMetadata) -> Self {
        if let Some(token) = meta
            .authorization
            .as_deref()
            .and_then(|value| value.strip_prefix(BEARER_SCHEME))
            .filter(|token| !token.is_empty())
        {
            let prefix: String = token.chars().take(CREDENTIAL_PREFIX_LEN).collect();
            return Self(format!("user:{prefix}"));
        }

        let forwarded = meta
            .forwarded_for
            .as_deref()
            .and_then(|list| list.split(',').next())
            .map(str::trim)
            .filter(|addr| !addr.is_empty());
        let real_ip = meta
            .real_ip
            .as_deref()
            .map(str::trim)
            .filter(|addr| !addr.is_empty());

        let addr = forwarded.or(real_ip).unwrap_or(UNKNOWN_ADDRESS);
        Self(format!("ip:{addr}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
