//! Link fetching - GET con timeout verso le pagine linkate nei messaggi

use crate::core::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use std::time::Duration;
use tracing::{debug, instrument};

/// Le pagine più grandi vengono troncate: title e meta description stanno nell'head
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const MAX_REDIRECTS: usize = 5;

/// Risposta di una GET: status http e body (vuoto se lo status non è di successo)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// Capacità di fare GET verso l'esterno, iniettabile così i test non toccano la rete
#[async_trait]
pub trait LinkFetcher: Send + Sync {
    /// GET di `url`, che deve completarsi entro `timeout`
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError>;
}

/// Fetcher reale basato su reqwest
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LinkFetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let mut response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        debug!(status = status.as_u16(), "Response received");
        if !status.is_success() {
            return Ok(FetchResponse {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            let room = MAX_BODY_BYTES - bytes.len();
            if chunk.len() >= room {
                bytes.extend_from_slice(&chunk[..room]);
                debug!("Body truncated at {} bytes", MAX_BODY_BYTES);
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchResponse {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_connect() {
        FetchError::Connect(err.to_string())
    } else {
        FetchError::Request(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new("enrich-server-test").unwrap()
    }

    #[tokio::test]
    async fn test_get_returns_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><head><title>foo</title></head></html>"),
            )
            .mount(&server)
            .await;

        let response = fetcher()
            .get(&format!("{}/page", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert!(response.body.contains("<title>foo</title>"));
    }

    #[tokio::test]
    async fn test_non_success_status_has_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let response = fetcher()
            .get(&server.uri(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let result = fetcher()
            .get(&server.uri(), Duration::from_millis(100))
            .await;

        assert!(matches!(result, Err(FetchError::Timeout)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_an_error() {
        // porta 1: nessuno in ascolto
        let result = fetcher()
            .get("http://127.0.0.1:1/", Duration::from_secs(2))
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_large_body_is_truncated() {
        let server = MockServer::start().await;
        let big = "a".repeat(MAX_BODY_BYTES + 10);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(big))
            .mount(&server)
            .await;

        let response = fetcher()
            .get(&server.uri(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response.body.len(), MAX_BODY_BYTES);
    }
}
