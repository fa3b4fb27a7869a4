//! Failure taxonomy for the PokeAPI client.
//!
//! [`PokeApiError`] is the single error type every fetcher returns, so callers
//! can match broadly (any failure) or narrowly (a single variant).

use crate::transport::TransportError;

pub const ERR_NO_INTERNET: &str = "Please connect to the internet\nto load Pokémon data";
pub const ERR_LOAD_FAILED: &str = "Failed to load data\nPlease try again";

/// Why a request never produced a usable JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkFailure {
    /// Connection refused, host unreachable or DNS failure.
    Unreachable,
    Timeout,
    /// The upstream answered with a non-success status.
    Status(u16),
    /// The body was not a JSON document.
    Envelope(String),
}

impl NetworkFailure {
    pub fn message(&self) -> &'static str {
        match self {
            NetworkFailure::Unreachable | NetworkFailure::Timeout => ERR_NO_INTERNET,
            NetworkFailure::Status(_) | NetworkFailure::Envelope(_) => ERR_LOAD_FAILED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PokeApiError {
    #[error("{}", .0.message())]
    Network(NetworkFailure),

    #[error("Pokemon '{query}' not found")]
    NotFound { query: String },

    /// The upstream body parsed as JSON but did not have the expected shape.
    #[error("{}", ERR_LOAD_FAILED)]
    Data { resource: String, detail: String },
}

impl PokeApiError {
    pub fn data(resource: impl Into<String>, detail: impl Into<String>) -> Self {
        PokeApiError::Data {
            resource: resource.into(),
            detail: detail.into(),
        }
    }

    /// Only connectivity problems are worth retrying; bad input and schema
    /// drift fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PokeApiError::Network(_))
    }

    /// Classifies a transport failure for any endpoint other than the entity lookup.
    pub(crate) fn from_transport(err: TransportError) -> Self {
        match err {
            TransportError::Connect(_) => PokeApiError::Network(NetworkFailure::Unreachable),
            TransportError::Timeout => PokeApiError::Network(NetworkFailure::Timeout),
            TransportError::Status(code) => PokeApiError::Network(NetworkFailure::Status(code)),
            TransportError::Body(msg) | TransportError::Other(msg) => {
                PokeApiError::Network(NetworkFailure::Envelope(msg))
            }
        }
    }

    /// Entity lookups treat a 404 as bad user input rather than a network problem.
    pub(crate) fn from_entity_transport(err: TransportError, query: &str) -> Self {
        match err {
            TransportError::Status(404) => PokeApiError::NotFound {
                query: query.to_string(),
            },
            other => Self::from_transport(other),
        }
    }
}
