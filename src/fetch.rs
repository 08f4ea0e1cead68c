//! HTTP transport for the PokeAPI REST service.
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::models::Pokemon;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

/// Anything that can hand out creature records by id.
///
/// The presentation layers only talk to this trait so they can be driven by
/// canned records in tests.
#[async_trait]
pub trait PokemonSource: Send + Sync {
    async fn pokemon(&self, id: u32) -> Result<Pokemon>;

    /// Raw bytes behind a sprite URL.
    async fn sprite(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP client for the PokeAPI REST service.
#[derive(Debug, Clone)]
pub struct PokemonApi {
    base_url: String,
    client: reqwest::Client,
}

impl Default for PokemonApi {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl PokemonApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn pokemon_url(&self, id: u32) -> String {
        format!("{}/pokemon/{}", self.base_url, id)
    }

    /// GET `{base_url}/{path}` and decode the body as JSON.
    pub async fn fetch_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let res = self.get(&url).await?;
        res.json::<Value>()
            .await
            .map_err(|source| ApiError::Decode { url, source })
    }

    /// Download the body behind an absolute URL, e.g. a sprite image.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let res = self.get(url).await?;
        let bytes = res.bytes().await.map_err(|source| ApiError::RemoteRequest {
            url: url.to_string(),
            status: None,
            source: Some(source),
        })?;
        Ok(bytes.to_vec())
    }

    /// Fetch one creature. The id is not range checked; upstream answers 404
    /// for ids it does not know.
    pub async fn get_pokemon(&self, id: u32) -> Result<Pokemon> {
        let record = self.fetch_json(&format!("pokemon/{}", id)).await?;
        Pokemon::from_value(record)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        tracing::debug!(%url, "GET");
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ApiError::RemoteRequest {
                url: url.to_string(),
                status: source.status().map(|s| s.as_u16()),
                source: Some(source),
            })?;
        let status = res.status();
        if status != StatusCode::OK {
            tracing::warn!(%url, status = status.as_u16(), "upstream returned non-200");
            return Err(ApiError::RemoteRequest {
                url: url.to_string(),
                status: Some(status.as_u16()),
                source: None,
            });
        }
        Ok(res)
    }
}

#[async_trait]
impl PokemonSource for PokemonApi {
    async fn pokemon(&self, id: u32) -> Result<Pokemon> {
        self.get_pokemon(id).await
    }

    async fn sprite(&self, url: &str) -> Result<Vec<u8>> {
        self.fetch_bytes(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_joined_without_double_slashes() {
        let api = PokemonApi::new("http://localhost:9000/api/v2/");
        assert_eq!(api.base_url(), "http://localhost:9000/api/v2");
        assert_eq!(api.pokemon_url(7), "http://localhost:9000/api/v2/pokemon/7");
    }

    #[test]
    fn default_points_at_public_api() {
        assert_eq!(
            PokemonApi::default().pokemon_url(151),
            "https://pokeapi.co/api/v2/pokemon/151"
        );
    }
}
