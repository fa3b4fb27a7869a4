use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Raw failure of a single GET, before it is classified into a [`crate::PokeApiError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status: {0}")]
    Status(u16),
    /// The response arrived but its body was not JSON.
    #[error("malformed body: {0}")]
    Body(String),
    #[error("request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status(status.as_u16())
        } else if err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, TransportError>> + Send + 'a>>;

/// Issues a GET and hands back the decoded JSON body.
pub trait Transport: Send + Sync {
    fn get_json<'a>(&'a self, url: &'a str, timeout: Duration) -> TransportFuture<'a>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get_json<'a>(&'a self, url: &'a str, timeout: Duration) -> TransportFuture<'a> {
        Box::pin(async move {
            tracing::debug!("GET {} (timeout {}s)", url, timeout.as_secs());

            let response = self
                .client
                .get(url)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| {
                    tracing::error!("Failed to make HTTP request to {}: {}", url, e);
                    TransportError::from(e)
                })?;

            if !response.status().is_success() {
                let status = response.status();
                tracing::debug!("Request to {} failed with status: {}", url, status);
                return Err(TransportError::Status(status.as_u16()));
            }

            response.json::<Value>().await.map_err(|e| {
                tracing::error!("Failed to parse JSON response from {}: {}", url, e);
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Body(e.to_string())
                }
            })
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_messages() {
        assert_eq!(
            TransportError::Connect("refused".into()).to_string(),
            "connection failed: refused"
        );
        assert_eq!(TransportError::Timeout.to_string(), "request timed out");
        assert_eq!(TransportError::Status(503).to_string(), "unexpected status: 503");
        let _: &dyn std::error::Error = &TransportError::Body("eof".into());
    }
}
