use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error};

use super::{read_json, LyricsResult, LyricsSource, TrackSummary};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestions {
    pub songs: Vec<TrackSummary>,
    pub total: u64,
}

impl Suggestions {
    pub fn from_json(value: &Value) -> Self {
        let songs: Vec<TrackSummary> = value
            .get("data")
            .and_then(Value::as_array)
            .map(|data| {
                data.iter()
                    .map(|item| TrackSummary {
                        track_id: item.get("id").and_then(Value::as_i64),
                        track_name: text(item.get("title")),
                        artist_name: text(item.pointer("/artist/name")),
                        album_name: text(item.pointer("/album/title")),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let total = value
            .get("total")
            .and_then(Value::as_u64)
            .unwrap_or(songs.len() as u64);

        Suggestions { songs, total }
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

pub struct LyricsOvhClient {
    client: Client,
    base_url: String,
}

impl LyricsOvhClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn suggestions(&self, query: &str) -> Result<Suggestions> {
        let url = format!("{}/suggest/{}", self.base_url, urlencoding::encode(query));
        let value = self.get(&url).await?;
        Ok(Suggestions::from_json(&value))
    }

    async fn get(&self, url: &str) -> Result<Value> {
        debug!("Querying lyrics.ovh: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            error!("Error calling lyrics.ovh: {}", e);
            AppError::Upstream(format!("Failed to reach lyrics.ovh: {}", e.without_url()))
        })?;

        read_json("lyrics.ovh", response).await
    }
}

#[async_trait]
impl LyricsSource for LyricsOvhClient {
    fn name(&self) -> &'static str {
        "lyrics.ovh"
    }

    async fn fetch_lyrics(&self, track_name: &str, artist_name: &str) -> Result<LyricsResult> {
        if artist_name.trim().is_empty() {
            return Err(AppError::Validation(
                "artist_name parameter is required".to_string(),
            ));
        }

        let url = format!(
            "{}/v1/{}/{}",
            self.base_url,
            urlencoding::encode(artist_name),
            urlencoding::encode(track_name)
        );
        let value = self.get(&url).await?;
        Ok(LyricsResult::from_json(&value))
    }
}
