use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error};

use super::{read_json, LyricsResult, LyricsSource, TrackSummary};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    pub songs: Vec<TrackSummary>,
    pub total_results: u64,
    pub status_code: Option<i64>,
}

impl SearchPage {
    pub fn from_json(value: &Value) -> Self {
        let header = value.pointer("/message/header");
        let songs = value
            .pointer("/message/body/track_list")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|item| item.get("track"))
                    .map(|track| TrackSummary {
                        track_id: track.get("track_id").and_then(Value::as_i64),
                        track_name: string_field(track, "track_name"),
                        artist_name: string_field(track, "artist_name"),
                        album_name: string_field(track, "album_name"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        SearchPage {
            songs,
            total_results: header
                .and_then(|h| h.get("available"))
                .and_then(Value::as_u64)
                .unwrap_or(0),
            status_code: header
                .and_then(|h| h.get("status_code"))
                .and_then(Value::as_i64),
        }
    }
}

fn string_field(value: &Value, name: &str) -> Option<String> {
    value.get(name).and_then(Value::as_str).map(str::to_string)
}

pub struct MusixMatchClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl MusixMatchClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Searches tracks that have lyrics, most popular first.
    pub async fn search_tracks(&self, query: &str, page: u32, page_size: u32) -> Result<SearchPage> {
        let params = [
            ("q", query.to_string()),
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
            ("s_track_rating", "desc".to_string()),
            ("f_has_lyrics", "1".to_string()),
        ];

        let value = self.request("track.search", &params).await?;
        Ok(SearchPage::from_json(&value))
    }

    async fn request(&self, method: &str, params: &[(&str, String)]) -> Result<Value> {
        let endpoint = format!("{}/{}", self.base_url, method);
        debug!("Calling MusixMatch {}", method);

        let mut request = self.client.get(&endpoint).query(params);
        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key)]);
        }

        let response = request.send().await.map_err(|e| {
            error!("Error making request to MusixMatch API: {}", e.without_url());
            AppError::Upstream("API request to MusixMatch failed".to_string())
        })?;
        let value = read_json("MusixMatch", response).await?;

        // MusixMatch reports most failures with HTTP 200 and a header status.
        match value.pointer("/message/header/status_code").and_then(Value::as_i64) {
            Some(code) if code != 200 => Err(AppError::Upstream(format!(
                "MusixMatch returned status {}",
                code
            ))),
            _ => Ok(value),
        }
    }
}

#[async_trait]
impl LyricsSource for MusixMatchClient {
    fn name(&self) -> &'static str {
        "musixmatch"
    }

    async fn fetch_lyrics(&self, track_name: &str, artist_name: &str) -> Result<LyricsResult> {
        let params = [
            ("q_track", track_name.to_string()),
            ("q_artist", artist_name.to_string()),
        ];

        let value = self.request("matcher.lyrics.get", &params).await?;
        Ok(LyricsResult::from_json(&value))
    }
}
