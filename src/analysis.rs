//! Lyrics summarisation backed by a chat model, with write-through caching.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::cache::{make_key, Cache};
use crate::error::{AppError, Result};
use crate::llm::ChatModel;
use crate::providers::LyricsSource;

pub const ANALYSIS_NAMESPACE: &str = "lyrics_analysis";
pub const ANALYSIS_TTL_SECS: u64 = 24 * 60 * 60;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that analyzes song lyrics to provide summaries and extract information. Respond in valid JSON format.";
const NO_SUMMARY: &str = "No summary available";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub track_name: String,
    pub artist_name: String,
    pub summary: String,
    #[serde(default)]
    pub countries_mentioned: Vec<String>,
}

pub struct LyricsAnalysisService {
    cache: Arc<Cache>,
    lyrics: Arc<dyn LyricsSource>,
    model: Arc<dyn ChatModel>,
}

impl LyricsAnalysisService {
    pub fn new(cache: Arc<Cache>, lyrics: Arc<dyn LyricsSource>, model: Arc<dyn ChatModel>) -> Self {
        Self { cache, lyrics, model }
    }

    /// Summarises a song and lists the countries its lyrics mention.
    ///
    /// A cached result for `(track_name, artist_name)` is returned as is.
    /// When `lyrics` is absent or blank the text is fetched from the lyrics
    /// provider first. Only successful analyses are cached.
    pub async fn analyze(
        &self,
        track_name: &str,
        artist_name: &str,
        lyrics: Option<&str>,
    ) -> Result<AnalysisResult> {
        let cache_key = make_key(ANALYSIS_NAMESPACE, &[track_name, artist_name]);
        if let Some(cached) = self.cache.get_json::<AnalysisResult>(&cache_key).await {
            return Ok(cached);
        }

        let lyrics = match lyrics.map(str::trim).filter(|text| !text.is_empty()) {
            Some(text) => text.to_string(),
            None => {
                info!("Fetching lyrics from {} for '{}' by '{}'", self.lyrics.name(), track_name, artist_name);
                self.lyrics.fetch_lyrics(track_name, artist_name).await?.body
            }
        };

        if lyrics.trim().is_empty() {
            return Err(AppError::Upstream(format!(
                "No lyrics found for '{}' by '{}'",
                track_name, artist_name
            )));
        }

        let prompt = build_prompt(track_name, artist_name, lyrics.trim());
        let llm_start = Instant::now();
        let reply = self.model.complete(SYSTEM_PROMPT, &prompt).await.map_err(|e| {
            error!("Error analyzing lyrics: {}", e);
            e
        })?;
        info!("LLM call completed in {:?}", llm_start.elapsed());

        let result = parse_analysis(track_name, artist_name, &reply)?;
        self.cache
            .set_json(&cache_key, &result, ANALYSIS_TTL_SECS)
            .await;

        Ok(result)
    }
}

pub fn build_prompt(track_name: &str, artist_name: &str, lyrics: &str) -> String {
    let mut prompt = String::with_capacity(lyrics.len() + 700);
    prompt.push_str(&format!(
        "Analyze the following song lyrics for '{}' by '{}':\n\n",
        track_name, artist_name
    ));
    prompt.push_str(lyrics);
    prompt.push_str(
        "\n\nPlease provide:\n\
         1. A concise one-paragraph summary of what the song is about. Capture the main themes and emotional tone without directly quoting large portions of the lyrics.\n\
         2. A list of any countries mentioned in the lyrics.\n\n\
         Format your response as JSON with the following structure:\n\
         {\n  \"summary\": \"your one-paragraph summary here\",\n  \"countries_mentioned\": [\"Country1\", \"Country2\"]\n}\n\n\
         If no countries are mentioned, return an empty array for countries_mentioned, not a string.",
    );
    prompt
}

/// Parses the model reply into an [`AnalysisResult`].
///
/// `countries_mentioned` is always an array: a missing, null or non-array
/// value becomes empty and non-string entries are dropped.
pub fn parse_analysis(track_name: &str, artist_name: &str, reply: &str) -> Result<AnalysisResult> {
    let value: Value = serde_json::from_str(strip_code_fence(reply)).map_err(|e| {
        error!("Error parsing analysis JSON: {}", e);
        AppError::Parse("Could not parse the analysis returned by the model".to_string())
    })?;

    if !value.is_object() {
        error!("Analysis reply is not a JSON object: {}", value);
        return Err(AppError::Parse(
            "Could not parse the analysis returned by the model".to_string(),
        ));
    }

    let summary = value
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(NO_SUMMARY)
        .to_string();

    let countries_mentioned = match value.get("countries_mentioned") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    Ok(AnalysisResult {
        track_name: track_name.to_string(),
        artist_name: artist_name.to_string(),
        summary,
        countries_mentioned,
    })
}

/// Models sometimes wrap JSON in a Markdown fence despite being told not to.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
