//! Library-side engine settings.  The binary fills these from flags and
//! environment variables.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL inbound webhook endpoints are published under, without a
    /// trailing slash.
    pub public_base_url: String,
    /// Per-request timeout for `send_webhook`.
    pub outbound_timeout: Duration,
    /// Upper bound on logs returned by a single listing call.
    pub max_log_page: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8080".to_owned(),
            outbound_timeout: Duration::from_secs(10),
            max_log_page: 200,
        }
    }
}

impl EngineConfig {
    /// Public URL external systems call for webhook `id`.
    pub fn webhook_url(&self, id: uuid::Uuid) -> String {
        format!(
            "{}/api/v1/hooks/{id}",
            self.public_base_url.trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_url_embeds_the_id() {
        let config = EngineConfig {
            public_base_url: "https://boards.example.test/".into(),
            ..EngineConfig::default()
        };
        let id = uuid::Uuid::nil();
        assert_eq!(
            config.webhook_url(id),
            "https://boards.example.test/api/v1/hooks/00000000-0000-0000-0000-000000000000"
        );
    }
}
