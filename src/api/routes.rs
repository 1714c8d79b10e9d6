use axum::{
    routing::get,
    Router,
    extract::{Json, State},
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::{Result, AppError};
use crate::api::extract::{ApiQuery, OptionalJson};
use crate::api::models::{
    AnalysisResponse, AnalyzeParams, HealthResponse, LyricsParams, LyricsResponse, Pagination,
    SearchParams, SearchResponse, SuggestParams, SuggestResponse,
};
use crate::AppState;

const MAX_PAGE_SIZE: u32 = 50;
const DEFAULT_PAGE_SIZE: u32 = 10;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/song/search", get(search_handler))
        .route("/song/suggest", get(suggest_handler))
        .route("/song/lyrics", get(lyrics_handler))
        .route("/song/analyze", get(analyze_get_handler).post(analyze_post_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{} parameter is required", name)))
}

/// Parses and clamps `page` / `page_size`, defaulting to 1 and 10.
fn pagination(page: Option<&str>, page_size: Option<&str>) -> Result<(u32, u32)> {
    fn parse(value: Option<&str>, default: i64) -> Option<i64> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => v.parse().ok(),
            None => Some(default),
        }
    }

    let (Some(page), Some(page_size)) = (parse(page, 1), parse(page_size, DEFAULT_PAGE_SIZE as i64)) else {
        return Err(AppError::Validation(
            "page and page_size must be valid integers".to_string(),
        ));
    };

    let page_size = if page_size > MAX_PAGE_SIZE as i64 {
        MAX_PAGE_SIZE
    } else if page_size < 1 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size as u32
    };
    let page = u32::try_from(page.max(1)).unwrap_or(u32::MAX);

    Ok((page, page_size))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        lyrics_provider: state.lyrics.name(),
        cache: state.cache.health(),
    })
}

async fn search_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let query = required(params.query, "query")?;
    let (page, page_size) = pagination(params.page.as_deref(), params.page_size.as_deref())?;

    let start_time = Instant::now();
    let result = state.musixmatch.search_tracks(&query, page, page_size).await;
    info!("Search for '{}' took {:?}", query, start_time.elapsed());

    let result = result.inspect_err(|e| warn!("Search for '{}' failed: {}", query, e))?;
    Ok(Json(SearchResponse {
        songs: result.songs,
        pagination: Pagination {
            current_page: page,
            page_size,
            total_results: result.total_results,
        },
        status_code: result.status_code,
    }))
}

async fn suggest_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SuggestParams>,
) -> Result<Json<SuggestResponse>> {
    let query = required(params.query, "query")?;

    let suggestions = state
        .lyrics_ovh
        .suggestions(&query)
        .await
        .inspect_err(|e| warn!("Suggestions for '{}' failed: {}", query, e))?;

    Ok(Json(SuggestResponse {
        songs: suggestions.songs,
        total: suggestions.total,
    }))
}

async fn lyrics_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<LyricsParams>,
) -> Result<Json<LyricsResponse>> {
    let track_name = required(params.track_name, "track_name")?;
    let artist_name = params.artist_name.unwrap_or_default();

    info!("Processing lyrics request for '{}' by '{}'", track_name, artist_name);
    let start_time = Instant::now();
    let result = state.lyrics.fetch_lyrics(&track_name, artist_name.trim()).await;
    info!("Lyrics lookup took {:?}", start_time.elapsed());

    let lyrics = result.inspect_err(|e| warn!("Lyrics lookup for '{}' failed: {}", track_name, e))?;
    Ok(Json(lyrics.into()))
}

async fn analyze_get_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<AnalyzeParams>,
) -> Result<Json<AnalysisResponse>> {
    analyze(&state, params).await
}

async fn analyze_post_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AnalyzeParams>,
    OptionalJson(body): OptionalJson<AnalyzeParams>,
) -> Result<Json<AnalysisResponse>> {
    let params = match body {
        Some(body) => body.or(query),
        None => query,
    };
    analyze(&state, params).await
}

async fn analyze(state: &AppState, params: AnalyzeParams) -> Result<Json<AnalysisResponse>> {
    let track_name = required(params.track_name, "track_name")?;
    let artist_name = required(params.artist_name, "artist_name")?;

    info!("Processing analysis request for '{}' by '{}'", track_name, artist_name);
    let start_time = Instant::now();
    let result = state
        .analysis
        .analyze(&track_name, &artist_name, params.lyrics.as_deref())
        .await;
    info!("Analysis request took {:?}", start_time.elapsed());

    let analysis = result.inspect_err(|e| warn!("Analysis of '{}' failed: {}", track_name, e))?;
    Ok(Json(analysis.into()))
}
