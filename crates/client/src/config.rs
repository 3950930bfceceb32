/// Endpoint used when no override is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:4000/graphql";

/// Connection parameters for the chat transport.
///
/// One config describes one logical connection: the subscription feed and
/// the post path share it for the whole process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub endpoint: String,
    /// Reconnect-on-drop is a transport concern, never application logic.
    pub reconnect: bool,
}

impl TransportConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim().to_string(),
            reconnect: true,
        }
    }

    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_endpoint_whitespace() {
        let config = TransportConfig::new("  ws://chat.example.com/graphql \n");
        assert_eq!(config.endpoint, "ws://chat.example.com/graphql");
        assert!(config.reconnect);
    }

    #[test]
    fn with_reconnect_overrides_default() {
        let config = TransportConfig::default().with_reconnect(false);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(!config.reconnect);
    }
}
