//! Clients for the third-party lyrics APIs.

pub mod lyrics_ovh;
pub mod musixmatch;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};

pub use lyrics_ovh::LyricsOvhClient;
pub use musixmatch::MusixMatchClient;

/// Builds the HTTP client shared by every outbound call.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Lyrics text and copyright line as returned by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsResult {
    pub body: String,
    pub copyright: String,
}

impl LyricsResult {
    /// Reads lyrics out of either the MusixMatch envelope
    /// (`message.body.lyrics.lyrics_body`) or a flat `{lyrics, copyright}`
    /// object. Absent fields become empty strings.
    pub fn from_json(value: &Value) -> Self {
        let source = value.pointer("/message/body/lyrics").unwrap_or(value);

        let field = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| source.get(*name).and_then(Value::as_str))
                .unwrap_or_default()
                .to_string()
        };

        LyricsResult {
            body: field(&["lyrics_body", "lyrics"]),
            copyright: field(&["lyrics_copyright", "copyright"]),
        }
    }
}

/// One hit from a search or suggestion lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub track_id: Option<i64>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
}

#[async_trait]
pub trait LyricsSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch_lyrics(&self, track_name: &str, artist_name: &str) -> Result<LyricsResult>;
}

/// Turns a non-2xx response or an `{"error": ...}` body into an upstream error.
pub(crate) async fn read_json(provider: &str, response: Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Upstream(format!(
            "{} request failed with HTTP {}",
            provider, status
        )));
    }

    let value: Value = response.json().await.map_err(|e| {
        tracing::error!("Unreadable {} response: {}", provider, e);
        AppError::Parse(format!("Could not parse the {} response", provider))
    })?;

    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Err(AppError::Upstream(message.to_string()));
    }

    Ok(value)
}
