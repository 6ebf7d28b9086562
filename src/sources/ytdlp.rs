use anyhow::{Context, Result};
use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{AudioInfo, AudioResolver};

/// Información extraída de yt-dlp
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: String,
    title: String,
    thumbnail: Option<String>,
    /// URL del formato elegido con `-f`
    url: Option<String>,
    webpage_url: Option<String>,
    #[serde(default)]
    entries: Vec<YtDlpInfo>,
}

/// Resolución de audio ejecutando yt-dlp como subproceso
pub struct YtDlpResolver {
    binary: String,
    // Limitar procesos concurrentes para evitar rate limiting
    rate_limiter: Semaphore,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>, max_concurrent: usize) -> Self {
        Self {
            binary: binary.into(),
            rate_limiter: Semaphore::new(max_concurrent.max(1)),
        }
    }

    /// Verifica que yt-dlp esté disponible
    pub async fn verify(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("{} no está disponible", self.binary))?;

        if !output.status.success() {
            anyhow::bail!("{} no puede ejecutarse correctamente", self.binary);
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl AudioResolver for YtDlpResolver {
    async fn resolve(&self, url_or_query: &str) -> Result<Option<AudioInfo>> {
        let _permit = self.rate_limiter.acquire().await?;

        debug!("🎵 Resolviendo audio para: {}", url_or_query);

        let output = Command::new(&self.binary)
            .args([
                "--no-playlist",
                "--dump-json",
                "--no-warnings",
                "-f",
                "bestaudio/best",
                "--default-search",
                "ytsearch1",
                url_or_query,
            ])
            .output()
            .await
            .context("Error al ejecutar yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            warn!("yt-dlp no encontró audio para '{}': {}", url_or_query, error.trim());
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let info = parse_output(&stdout)?;
        if let Some(info) = &info {
            info!("✅ Audio resuelto: {}", info.title);
        }
        Ok(info)
    }
}

fn parse_output(stdout: &str) -> Result<Option<AudioInfo>> {
    let Some(line) = stdout.lines().find(|l| !l.trim().is_empty()) else {
        return Ok(None);
    };

    let mut info: YtDlpInfo =
        serde_json::from_str(line).context("Error al parsear respuesta de yt-dlp")?;

    if !info.entries.is_empty() {
        info = info.entries.remove(0);
    }

    let Some(stream_url) = info.url else {
        return Ok(None);
    };

    Ok(Some(AudioInfo {
        canonical_url: info
            .webpage_url
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", info.id)),
        stream_url,
        title: info.title,
        thumbnail: info.thumbnail,
    }))
}
