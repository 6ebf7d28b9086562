use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Cómo elige el motor un track cuando la cola de peticiones está vacía.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// Rotación barajada sin repetición sobre todo el catálogo.
    Shuffle,
    /// Registro aleatorio del catálogo, distinto del último elegido.
    Random,
}

impl FromStr for FallbackMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shuffle" => Ok(Self::Shuffle),
            "random" => Ok(Self::Random),
            other => anyhow::bail!("Unknown fallback mode: {}", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub command_prefix: String,
    pub delete_requests: bool,

    // Metadata search
    pub spotify_client_id: String,
    pub spotify_client_secret: String,

    // Audio
    pub ytdlp_path: String,
    pub search_concurrency: usize,

    // Rendimiento
    pub cache_size: usize,
    pub cache_ttl: u64, // En segundos

    // Paths
    pub data_dir: PathBuf,

    // Motor
    pub fallback_mode: FallbackMode,
    pub max_consecutive_failures: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN is not set")?,
            command_prefix: std::env::var("COMMAND_PREFIX").unwrap_or(defaults.command_prefix),
            delete_requests: env_or("DELETE_REQUESTS", defaults.delete_requests)?,

            // Metadata search
            spotify_client_id: std::env::var("SPOTIFY_CLIENT_ID")
                .context("SPOTIFY_CLIENT_ID is not set")?,
            spotify_client_secret: std::env::var("SPOTIFY_CLIENT_SECRET")
                .context("SPOTIFY_CLIENT_SECRET is not set")?,

            // Audio
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
            search_concurrency: env_or("SEARCH_CONCURRENCY", defaults.search_concurrency)?,

            // Rendimiento
            cache_size: env_or("CACHE_SIZE", defaults.cache_size)?,
            cache_ttl: env_or("CACHE_TTL", defaults.cache_ttl)?,

            // Paths
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),

            // Motor
            fallback_mode: env_or("FALLBACK_MODE", defaults.fallback_mode)?,
            max_consecutive_failures: env_or(
                "MAX_CONSECUTIVE_FAILURES",
                defaults.max_consecutive_failures,
            )?,
        };

        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("cannot create {}", config.data_dir.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - The command prefix must not be empty
    /// - Concurrency, cache and failure limits must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.command_prefix.trim().is_empty() {
            anyhow::bail!("Command prefix must not be empty");
        }

        if self.search_concurrency == 0 {
            anyhow::bail!("Search concurrency must be greater than 0");
        }

        if self.cache_size == 0 {
            anyhow::bail!("Cache size must be greater than 0");
        }

        if self.max_consecutive_failures == 0 {
            anyhow::bail!("Max consecutive failures must be greater than 0");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Tokens and client secrets are never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Requests: prefix '{}', delete={}\n  \
            Resolver: {} ({} concurrent)\n  \
            Cache: {} entries, {}s ttl\n  \
            Catalog: {}\n  \
            Engine: fallback={:?}, max failures={}",
            self.command_prefix,
            self.delete_requests,
            self.ytdlp_path,
            self.search_concurrency,
            self.cache_size,
            self.cache_ttl,
            self.data_dir.display(),
            self.fallback_mode,
            self.max_consecutive_failures,
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (sin valores por defecto para credenciales)
            discord_token: String::new(),
            command_prefix: ".".to_string(),
            delete_requests: true,

            spotify_client_id: String::new(),
            spotify_client_secret: String::new(),

            ytdlp_path: "yt-dlp".to_string(),
            search_concurrency: 3,

            cache_size: 256,
            cache_ttl: 3600, // 1 hora

            data_dir: "./data".into(),

            fallback_mode: FallbackMode::Shuffle,
            max_consecutive_failures: 3,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => val
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e)),
        _ => Ok(default),
    }
}
