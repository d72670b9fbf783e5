//! Management API client.

use std::error::Error as StdError;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use tracing::{debug, trace};

use crate::config::BrokerSettings;
use crate::queue::{QueueRecord, parse_queue_listing};

/// Error type for queue listing fetches.
///
/// Every variant means the same thing to callers: the fetch failed and the
/// broker is considered down.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    #[error("Request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Broker returned {status} for {url}")]
    Status { url: String, status: StatusCode },
    #[error("Failed to parse queue listing")]
    Parse(#[from] serde_json::Error),
}

impl FetchError {
    /// Render the error with its full source chain.
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}

/// Client for the RabbitMQ management API.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    http: reqwest::Client,
    settings: BrokerSettings,
    queues_url: String,
}

impl BrokerClient {
    /// Create a client. The timeout and TLS settings are fixed for its lifetime.
    pub fn new(settings: BrokerSettings) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .build()
            .map_err(FetchError::Client)?;

        let queues_url = settings.queues_url();

        Ok(Self {
            http,
            settings,
            queues_url,
        })
    }

    /// Fetch the queue listing.
    ///
    /// Issues exactly one `GET /api/queues`. The configured timeout bounds
    /// the whole exchange, including reading the body.
    pub async fn fetch_queues(&self) -> Result<Vec<QueueRecord>, FetchError> {
        trace!(url = %self.queues_url, "Fetching queue listing");

        let mut request = self.http.get(&self.queues_url);
        if let Some(token) = &self.settings.auth_token {
            request = request.header(AUTHORIZATION, format!("Basic {}", token));
        }

        let response = request.send().await.map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.queues_url.clone(),
                status,
            });
        }

        let body = response.bytes().await.map_err(|e| self.request_error(e))?;
        let queues = parse_queue_listing(&body)?;

        debug!(
            queues = queues.len(),
            bytes = body.len(),
            "Fetched queue listing"
        );

        Ok(queues)
    }

    fn request_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: self.queues_url.clone(),
                timeout: self.settings.timeout,
            }
        } else {
            FetchError::Request {
                url: self.queues_url.clone(),
                source: err,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn unreachable_settings() -> BrokerSettings {
        // Port 1 is never served in test environments.
        BrokerSettings::new(Url::parse("http://127.0.0.1:1").unwrap())
            .with_timeout(Duration::from_secs(2))
    }

    #[test]
    fn test_client_uses_queue_endpoint() {
        let client = BrokerClient::new(unreachable_settings()).unwrap();
        assert_eq!(client.queues_url, "http://127.0.0.1:1/api/queues");
        assert_eq!(client.settings.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_client_without_tls_verification() {
        let settings = unreachable_settings().with_verify_ssl(false);
        assert!(BrokerClient::new(settings).is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_error() {
        let client = BrokerClient::new(unreachable_settings()).unwrap();

        let err = client.fetch_queues().await.unwrap_err();

        assert!(matches!(err, FetchError::Request { .. }), "got {:?}", err);
        assert!(err.chain().starts_with("Request to http://127.0.0.1:1/api/queues failed: "));
    }

    #[test]
    fn test_parse_error_chain_includes_cause() {
        let err = FetchError::from(serde_json::from_str::<Vec<QueueRecord>>("{}").unwrap_err());

        let chain = err.chain();
        assert!(chain.starts_with("Failed to parse queue listing: "));
        assert!(chain.len() > "Failed to parse queue listing: ".len());
    }
}
