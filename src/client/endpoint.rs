use crate::types::{API_PREFIX, ChannelError, Result, TOKEN_QUERY_PARAM};
use url::Url;

/// Which stream a channel joins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelTopic {
    /// In-app notifications for the signed-in user
    Notifications,
    /// Conversation list updates for the admin dashboard
    AdminConversations,
    /// A single chat room
    Conversation(u64),
    /// Any other socket path below the API prefix
    Custom(String),
}

impl ChannelTopic {
    /// Path below `/api/v1/`
    pub fn path(&self) -> String {
        match self {
            Self::Notifications => "notifications/ws".to_string(),
            Self::AdminConversations => "admin/conversations/ws".to_string(),
            Self::Conversation(id) => format!("chat/rooms/{}/ws", id),
            Self::Custom(path) => path.trim_matches('/').to_string(),
        }
    }
}

/// Base URL plus topic. Immutable for the life of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEndpoint {
    base: Url,
    topic: ChannelTopic,
}

impl ChannelEndpoint {
    /// Accepts `http(s)://` or `ws(s)://` base URLs; HTTP schemes are mapped
    /// to their socket counterparts.
    pub fn new(base_url: &str, topic: ChannelTopic) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        let scheme = match base.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(ChannelError::InvalidEndpoint(format!(
                    "unsupported scheme '{}'",
                    other
                )));
            }
        };
        base.set_scheme(scheme)
            .map_err(|_| ChannelError::InvalidEndpoint(format!("cannot use scheme '{}'", scheme)))?;
        base.set_query(None);
        base.set_fragment(None);

        if let ChannelTopic::Custom(path) = &topic {
            if path.trim_matches('/').is_empty() {
                return Err(ChannelError::InvalidEndpoint("empty topic path".to_string()));
            }
        }

        Ok(Self { base, topic })
    }

    pub fn topic(&self) -> &ChannelTopic {
        &self.topic
    }

    /// Socket URL without credentials; safe to log
    pub fn url(&self) -> Url {
        let mut url = self.base.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        let path = if base_path.ends_with(API_PREFIX) {
            format!("{}/{}", base_path, self.topic.path())
        } else {
            format!("{}/{}/{}", base_path, API_PREFIX, self.topic.path())
        };
        url.set_path(&path);
        url
    }

    /// Socket URL carrying the access token
    pub fn socket_url(&self, token: &str) -> Url {
        let mut url = self.url();
        url.query_pairs_mut().append_pair(TOKEN_QUERY_PARAM, token);
        url
    }
}

impl std::fmt::Display for ChannelEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_base_becomes_wss_with_token() {
        let endpoint =
            ChannelEndpoint::new("https://api.treesindia.com", ChannelTopic::Notifications).unwrap();
        assert_eq!(
            endpoint.socket_url("abc").as_str(),
            "wss://api.treesindia.com/api/v1/notifications/ws?token=abc"
        );
        assert_eq!(
            endpoint.to_string(),
            "wss://api.treesindia.com/api/v1/notifications/ws"
        );
    }

    #[test]
    fn test_base_with_api_prefix_is_not_doubled() {
        let endpoint =
            ChannelEndpoint::new("http://localhost:8080/api/v1/", ChannelTopic::Conversation(9))
                .unwrap();
        assert_eq!(
            endpoint.url().as_str(),
            "ws://localhost:8080/api/v1/chat/rooms/9/ws"
        );
    }

    #[test]
    fn test_token_is_query_encoded() {
        let endpoint =
            ChannelEndpoint::new("wss://x.example", ChannelTopic::AdminConversations).unwrap();
        assert_eq!(
            endpoint.socket_url("a b&c").as_str(),
            "wss://x.example/api/v1/admin/conversations/ws?token=a+b%26c"
        );
    }

    #[test]
    fn test_rejects_unknown_scheme_and_empty_custom_path() {
        assert!(matches!(
            ChannelEndpoint::new("ftp://x.example", ChannelTopic::Notifications),
            Err(ChannelError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            ChannelEndpoint::new("https://x.example", ChannelTopic::Custom("/".to_string())),
            Err(ChannelError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            ChannelEndpoint::new("not a url", ChannelTopic::Notifications),
            Err(ChannelError::UrlParse(_))
        ));
    }
}
