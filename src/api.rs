//! PokeAPI client
//!
//! Thin GET wrapper: resolves paths against the fixed base URL, decodes JSON
//! and maps non-success statuses to [`QueryError::Api`]. Retrying is the
//! query cache's job, not this module's.

use crate::constants::API_BASE_URL;
use crate::error::QueryError;
use crate::types::{PokemonDetail, PokemonPage, TypeDetail, TypeList};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: &'static str,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: API_BASE_URL,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(base_url: &'static str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Absolute URLs pass through, paths are appended to the base URL
    pub fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<T, QueryError> {
        let url = self.resolve_url(path);

        let request = async {
            debug!(url = %url, "GET");
            let response = self
                .http
                .get(&url)
                .header(ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| QueryError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(QueryError::Api {
                    status: status.as_u16(),
                    status_text: status.canonical_reason().unwrap_or_default().to_string(),
                    url: url.clone(),
                });
            }

            response
                .json::<T>()
                .await
                .map_err(|e| QueryError::Decode(e.to_string()))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(QueryError::Cancelled),
            result = request => result,
        }
    }

    pub async fn list_pokemon(
        &self,
        limit: u32,
        offset: u32,
        cancel: &CancellationToken,
    ) -> Result<PokemonPage, QueryError> {
        self.get_json(&format!("/pokemon?limit={}&offset={}", limit, offset), cancel)
            .await
    }

    pub async fn get_pokemon(
        &self,
        name_or_id: &str,
        cancel: &CancellationToken,
    ) -> Result<PokemonDetail, QueryError> {
        self.get_json(&format!("/pokemon/{}", path_segment(name_or_id)), cancel)
            .await
    }

    pub async fn list_types(&self, cancel: &CancellationToken) -> Result<TypeList, QueryError> {
        self.get_json("/type", cancel).await
    }

    pub async fn get_type(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<TypeDetail, QueryError> {
        self.get_json(&format!("/type/{}", path_segment(name)), cancel)
            .await
    }
}

// PokeAPI names are lower-case slugs
fn path_segment(name: &str) -> String {
    url::form_urlencoded::byte_serialize(name.trim().to_lowercase().as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_and_absolute() {
        let api = ApiClient::new();
        assert_eq!(
            api.resolve_url("/pokemon?limit=5&offset=0"),
            "https://pokeapi.co/api/v2/pokemon?limit=5&offset=0"
        );
        assert_eq!(
            api.resolve_url("https://pokeapi.co/api/v2/type/10/"),
            "https://pokeapi.co/api/v2/type/10/"
        );
    }

    #[test]
    fn path_segments_are_normalized() {
        assert_eq!(path_segment(" Mr-Mime "), "mr-mime");
        assert_eq!(path_segment("a b"), "a+b");
        assert_eq!(path_segment("25"), "25");
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let api = ApiClient::new();
        let token = CancellationToken::new();
        token.cancel();
        let result = api.get_pokemon("pikachu", &token).await;
        assert_eq!(result.unwrap_err(), QueryError::Cancelled);
    }
}
