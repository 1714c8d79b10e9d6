pub mod analysis;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod providers;

use std::sync::Arc;
use analysis::LyricsAnalysisService;
use cache::Cache;
use config::{Config, LyricsProvider};
use error::Result;
use llm::DeepSeekClient;
use providers::{build_http_client, LyricsOvhClient, LyricsSource, MusixMatchClient};

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<Cache>,
    pub musixmatch: Arc<MusixMatchClient>,
    pub lyrics_ovh: Arc<LyricsOvhClient>,
    /// Provider answering `/song/lyrics` and analysis lookups.
    pub lyrics: Arc<dyn LyricsSource>,
    pub analysis: Arc<LyricsAnalysisService>,
}

impl AppState {
    /// Builds every client once and probes the cache backend.
    pub async fn from_config(config: Config) -> Result<Self> {
        let client = build_http_client(config.http_timeout)?;
        let cache = Arc::new(Cache::connect(&config).await?);

        let musixmatch = Arc::new(MusixMatchClient::new(
            client.clone(),
            config.musixmatch_base_url.clone(),
            config.musixmatch_api_key.clone(),
        ));
        let lyrics_ovh = Arc::new(LyricsOvhClient::new(
            client.clone(),
            config.lyrics_ovh_base_url.clone(),
        ));
        let lyrics: Arc<dyn LyricsSource> = match config.lyrics_provider {
            LyricsProvider::MusixMatch => musixmatch.clone(),
            LyricsProvider::LyricsOvh => lyrics_ovh.clone(),
        };

        let model = Arc::new(DeepSeekClient::new(
            client,
            config.deepseek_api_url.clone(),
            config.deepseek_api_key.clone(),
            config.deepseek_model.clone(),
        ));
        let analysis = Arc::new(LyricsAnalysisService::new(cache.clone(), lyrics.clone(), model));

        Ok(AppState {
            cache,
            musixmatch,
            lyrics_ovh,
            lyrics,
            analysis,
        })
    }
}
