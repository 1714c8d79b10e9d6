use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::cache::CacheHealth;
use crate::providers::{LyricsResult, TrackSummary};

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestParams {
    pub query: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LyricsParams {
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
}

/// Accepted both as a query string and as a JSON body.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeParams {
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub lyrics: Option<String>,
}

impl AnalyzeParams {
    /// Fields present in `self` win over those in `fallback`.
    pub fn or(self, fallback: AnalyzeParams) -> AnalyzeParams {
        AnalyzeParams {
            track_name: self.track_name.or(fallback.track_name),
            artist_name: self.artist_name.or(fallback.artist_name),
            lyrics: self.lyrics.or(fallback.lyrics),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub page_size: u32,
    pub total_results: u64,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub songs: Vec<TrackSummary>,
    pub pagination: Pagination,
    pub status_code: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub songs: Vec<TrackSummary>,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct LyricsResponse {
    pub lyrics: String,
    pub copyright: String,
}

impl From<LyricsResult> for LyricsResponse {
    fn from(result: LyricsResult) -> Self {
        LyricsResponse {
            lyrics: result.body,
            copyright: result.copyright,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub track_name: String,
    pub artist_name: String,
    pub summary: String,
    pub countries_mentioned: Vec<String>,
    pub countries_message: String,
}

impl From<AnalysisResult> for AnalysisResponse {
    fn from(result: AnalysisResult) -> Self {
        let countries_message = if result.countries_mentioned.is_empty() {
            "No countries mentioned in the lyrics".to_string()
        } else {
            format!("Countries mentioned: {}", result.countries_mentioned.join(", "))
        };

        AnalysisResponse {
            track_name: result.track_name,
            artist_name: result.artist_name,
            summary: result.summary,
            countries_mentioned: result.countries_mentioned,
            countries_message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub lyrics_provider: &'static str,
    pub cache: CacheHealth,
}
