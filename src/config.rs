use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;
use crate::error::{AppError, Result};

const DEFAULT_MUSIXMATCH_BASE_URL: &str = "https://api.musixmatch.com/ws/1.1";
const DEFAULT_LYRICS_OVH_BASE_URL: &str = "https://api.lyrics.ovh";
const DEFAULT_DEEPSEEK_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";
const DEFAULT_DEEPSEEK_MODEL: &str = "deepseek-chat";

/// Which provider serves lyrics text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricsProvider {
    MusixMatch,
    LyricsOvh,
}

impl FromStr for LyricsProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "musixmatch" => Ok(LyricsProvider::MusixMatch),
            "lyricsovh" | "lyrics.ovh" | "lyrics_ovh" => Ok(LyricsProvider::LyricsOvh),
            other => Err(AppError::Config(format!("Unknown lyrics provider: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    Disabled,
    Memory,
    Redis(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub musixmatch_api_key: Option<String>,
    pub musixmatch_base_url: String,
    pub lyrics_ovh_base_url: String,
    pub lyrics_provider: LyricsProvider,
    pub deepseek_api_key: Option<String>,
    pub deepseek_api_url: String,
    pub deepseek_model: String,
    pub cache_backend: CacheBackend,
    /// When set, a cache health probe older than this is redone on next access.
    pub cache_health_interval: Option<Duration>,
    pub http_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = var("PORT").unwrap_or_else(|| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::Config(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::Config(format!("Invalid host address: {}", e)))?;

        let musixmatch_api_key = var("MUSIXMATCH_API_KEY");
        let deepseek_api_key = var("DEEPSEEK_API_KEY");

        let lyrics_provider = match var("LYRICS_PROVIDER") {
            Some(value) => value.parse()?,
            None => LyricsProvider::MusixMatch,
        };

        let redis_url = var("REDIS_URL");
        let cache_backend = match var("CACHE_BACKEND").map(|v| v.to_ascii_lowercase()) {
            None => redis_url.map(CacheBackend::Redis).unwrap_or(CacheBackend::Disabled),
            Some(kind) => match kind.as_str() {
                "none" | "disabled" | "off" => CacheBackend::Disabled,
                "memory" => CacheBackend::Memory,
                "redis" => CacheBackend::Redis(redis_url.ok_or_else(|| {
                    AppError::Config("CACHE_BACKEND=redis requires REDIS_URL".to_string())
                })?),
                other => return Err(AppError::Config(format!("Unknown cache backend: {}", other))),
            },
        };

        let cache_health_interval = var("CACHE_HEALTH_INTERVAL_SECS")
            .map(|v| parse_secs("CACHE_HEALTH_INTERVAL_SECS", &v))
            .transpose()?;

        let http_timeout = match var("HTTP_TIMEOUT_SECS") {
            Some(v) => parse_secs("HTTP_TIMEOUT_SECS", &v)?,
            None => Duration::from_secs(30),
        };

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            musixmatch_api_key,
            musixmatch_base_url: var("MUSIXMATCH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_MUSIXMATCH_BASE_URL.to_string()),
            lyrics_ovh_base_url: var("LYRICS_OVH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LYRICS_OVH_BASE_URL.to_string()),
            lyrics_provider,
            deepseek_api_key,
            deepseek_api_url: var("DEEPSEEK_API_URL")
                .unwrap_or_else(|| DEFAULT_DEEPSEEK_API_URL.to_string()),
            deepseek_model: var("DEEPSEEK_MODEL")
                .unwrap_or_else(|| DEFAULT_DEEPSEEK_MODEL.to_string()),
            cache_backend,
            cache_health_interval,
            http_timeout,
        })
    }

    /// Logs a warning for each unset API key. Called once logging is up.
    pub fn warn_missing_keys(&self) {
        if self.musixmatch_api_key.is_none() {
            warn!("MUSIXMATCH_API_KEY not found in environment variables");
        }
        if self.deepseek_api_key.is_none() {
            warn!("DEEPSEEK_API_KEY not found in environment variables, lyrics analysis will fail");
        }
    }
}

fn parse_secs(name: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e)))
}
