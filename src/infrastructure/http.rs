use crate::auth::TokenProvider;
use crate::types::{API_PREFIX, ChannelError, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Standard response envelope returned by every REST endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Pagination block attached to list responses.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct PagedEnvelope<T> {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct UnreadCount {
    unread_count: u64,
}

/// REST client used to refetch state after the event channel reconnects.
///
/// The event channel only pushes increments; the REST API is the system of
/// record. Construct one per application and pass it where needed.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl RestClient {
    pub fn new(base_url: &str, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        Self::with_http_client(reqwest::Client::new(), base_url, tokens)
    }

    pub fn with_http_client(
        http: reqwest::Client,
        base_url: &str,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ChannelError::InvalidEndpoint(format!(
                "REST base URL must be http(s), got '{}'",
                base_url.scheme()
            )));
        }
        let path = format!("{}/{}/", base_url.path().trim_end_matches('/'), API_PREFIX);
        base_url.set_path(&path);
        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    /// Resolves `path` (relative, e.g. `notifications`) under `/api/v1/`.
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// GET an endpoint and unwrap its envelope.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let envelope: ApiEnvelope<T> = self.send(path, query).await?;
        if !envelope.success {
            return Err(ChannelError::Api(envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| ChannelError::Api(format!("response for '{}' has no data", path)))
    }

    /// GET a paginated list endpoint.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<T>> {
        let query = [("page", page.to_string()), ("limit", limit.to_string())];
        let envelope: PagedEnvelope<T> = self.send(path, &query).await?;
        if !envelope.success {
            return Err(ChannelError::Api(envelope.message));
        }
        let pagination = envelope.pagination.ok_or_else(|| {
            ChannelError::Api(format!("response for '{}' has no pagination", path))
        })?;
        Ok(Page {
            data: envelope.data,
            pagination,
        })
    }

    pub async fn notifications(&self, page: u32, limit: u32) -> Result<Page<Value>> {
        self.get_page("notifications", page, limit).await
    }

    pub async fn unread_count(&self) -> Result<u64> {
        let count: UnreadCount = self.get("notifications/unread-count", &[]).await?;
        Ok(count.unread_count)
    }

    pub async fn conversation_messages(
        &self,
        room_id: u64,
        page: u32,
        limit: u32,
    ) -> Result<Page<Value>> {
        self.get_page(&format!("chat/rooms/{}/messages", room_id), page, limit)
            .await
    }

    async fn send<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path)?;
        let mut request = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .query(query);
        if let Some(token) = self.tokens.access_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        tracing::debug!("GET {} -> {}", path, status);

        if !status.is_success() {
            // Error responses still carry the envelope; prefer its message.
            let message = serde_json::from_slice::<ApiEnvelope<Value>>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(ChannelError::Api(format!("GET {} failed: {}", path, message)));
        }
        Ok(serde_json::from_slice(&body)?)
    }
}
