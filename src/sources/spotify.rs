use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use super::{MetadataMatch, MetadataSearch};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SEARCH_URL: &str = "https://api.spotify.com/v1/search";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    name: String,
    artists: Vec<SpotifyArtist>,
    album: SpotifyAlbum,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Cliente de búsqueda de Spotify con credenciales de aplicación
pub struct SpotifySearch {
    client_id: String,
    client_secret: String,
    client: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl SpotifySearch {
    pub fn new(client_id: String, client_secret: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client_id,
            client_secret,
            client,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let cached = self
            .token
            .lock()
            .as_ref()
            .filter(|token| token.expires_at > Instant::now())
            .map(|token| token.value.clone());
        if let Some(value) = cached {
            return Ok(value);
        }

        debug!("🔑 Renovando token de Spotify");

        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("❌ Spotify token error: {} - {}", status, error_text);
            anyhow::bail!("Spotify token error: {}", status);
        }

        let token: TokenResponse = response.json().await?;
        // Margen para no usar un token a punto de caducar
        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(30));
        *self.token.lock() = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}

#[async_trait]
impl MetadataSearch for SpotifySearch {
    async fn search(&self, query: &str) -> Result<Option<MetadataMatch>> {
        info!("🔍 Buscando en Spotify: {}", query);

        let token = self.access_token().await?;
        let response = self
            .client
            .get(SEARCH_URL)
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("❌ Spotify API error: {} - {}", status, error_text);
            anyhow::bail!("Spotify API error: {}", status);
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.tracks.items.into_iter().next().map(into_match))
    }
}

fn into_match(track: SpotifyTrack) -> MetadataMatch {
    MetadataMatch {
        catalog_id: track.id,
        title: track.name,
        artist: track
            .artists
            .into_iter()
            .next()
            .map(|a| a.name)
            .unwrap_or_else(|| "Unknown".to_string()),
        thumbnail: track.album.images.into_iter().next().map(|i| i.url),
    }
}
