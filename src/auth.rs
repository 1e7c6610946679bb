//! Access token sources.
//!
//! The socket URL and REST requests carry a bearer token. It is looked up on
//! every connection attempt, so a refreshed token is picked up by the next
//! reconnect without rebuilding the client.

use crate::types::{ACCESS_TOKEN_COOKIE, ACCESS_TOKEN_ENV};

/// Supplies the current access token, or `None` when the user is signed out.
pub trait TokenProvider: Send + Sync + 'static {
    fn access_token(&self) -> Option<String>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync + 'static,
{
    fn access_token(&self) -> Option<String> {
        self()
    }
}

/// A fixed token.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Reads the token from an environment variable (`TREESINDIA_ACCESS_TOKEN` by default).
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(ACCESS_TOKEN_ENV)
    }
}

impl TokenProvider for EnvToken {
    fn access_token(&self) -> Option<String> {
        std::env::var(&self.var).ok()
    }
}

/// Extracts the token from a `Cookie` header value, the way the web and
/// mobile clients store it.
#[derive(Debug, Clone)]
pub struct CookieToken {
    cookies: String,
    name: String,
}

impl CookieToken {
    pub fn new(cookie_header: impl Into<String>) -> Self {
        Self {
            cookies: cookie_header.into(),
            name: ACCESS_TOKEN_COOKIE.to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl TokenProvider for CookieToken {
    fn access_token(&self) -> Option<String> {
        self.cookies
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value.trim_matches('"').to_string())
    }
}
