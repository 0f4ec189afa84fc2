//! Error types shared by the API client, query cache and storage

use thiserror::Error;

/// Failure of one logical query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Transport failure before a response arrived
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("API {status} {status_text} - {url}")]
    Api {
        status: u16,
        status_text: String,
        url: String,
    },

    #[error("invalid response body: {0}")]
    Decode(String),

    /// Aborted by the caller. Never shown to the user.
    #[error("request cancelled")]
    Cancelled,
}

impl QueryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryError::Api { status: 404, .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueryError::Cancelled)
    }

    pub fn is_retryable(&self) -> bool {
        !self.is_not_found() && !self.is_cancelled()
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed value under {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> QueryError {
        QueryError::Api {
            status,
            status_text: String::new(),
            url: "https://pokeapi.co/api/v2/pokemon/missingno".into(),
        }
    }

    #[test]
    fn classification() {
        assert!(api(404).is_not_found());
        assert!(!api(404).is_retryable());
        assert!(api(500).is_retryable());
        assert!(api(429).is_retryable());
        assert!(QueryError::Network("reset".into()).is_retryable());
        assert!(!QueryError::Cancelled.is_retryable());
    }

    #[test]
    fn api_error_message() {
        let err = QueryError::Api {
            status: 503,
            status_text: "Service Unavailable".into(),
            url: "https://pokeapi.co/api/v2/type".into(),
        };
        assert_eq!(
            err.to_string(),
            "API 503 Service Unavailable - https://pokeapi.co/api/v2/type"
        );
    }
}
