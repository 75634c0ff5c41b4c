//! HTTP surface: health check and the video-processing pipeline.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, NewSummary};
use crate::error::{AppError, AppResult, UpstreamStage};
use crate::state::AppState;
use crate::summarize::{SummaryInput, SummaryStyle};
use crate::{VideoMetadata, extract_video_id};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/process-video", post(process_video))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "quicktube-backend",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

// ---------------------------------------------------------------------------
// POST /api/process-video
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProcessVideoRequest {
    pub video_url: Option<String>,
    pub user_id: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessVideoResponse {
    pub success: bool,
    pub summary_id: Uuid,
    pub summary: String,
    pub metadata: VideoMetadata,
    pub credits_remaining: i32,
}

/// Run the full pipeline for one video: validate, gate on credits, fetch
/// metadata and transcript, summarize, then debit + persist atomically.
async fn process_video(
    State(state): State<AppState>,
    Json(req): Json<ProcessVideoRequest>,
) -> AppResult<Json<ProcessVideoResponse>> {
    let video_url = req.video_url.as_deref().map(str::trim).unwrap_or_default();
    let user_id_raw = req.user_id.as_deref().map(str::trim).unwrap_or_default();
    if video_url.is_empty() || user_id_raw.is_empty() {
        return Err(AppError::Validation("video_url et user_id requis".into()));
    }

    let user_id = Uuid::parse_str(user_id_raw)
        .map_err(|_| AppError::Validation("user_id invalide".into()))?;

    let video_id = extract_video_id(video_url)
        .ok_or_else(|| AppError::Validation("URL YouTube invalide".into()))?;

    let style = SummaryStyle::parse(req.style.as_deref());

    // Credit gate runs before any provider call.
    let profile = db::find_profile(&state.pool, user_id)
        .await?
        .ok_or(AppError::UserNotFound(user_id))?;
    if profile.credits_remaining <= 0 {
        return Err(AppError::QuotaExceeded);
    }

    tracing::info!(%user_id, %video_id, %style, "Processing video");

    let metadata = state
        .fetcher
        .fetch_metadata(&video_id)
        .await
        .map_err(|e| AppError::upstream(UpstreamStage::Metadata, e))?;

    let transcript = state
        .fetcher
        .fetch_transcript(&video_id)
        .await
        .map_err(|e| AppError::upstream(UpstreamStage::Transcript, e))?;

    let input = SummaryInput {
        video_url: video_url.to_string(),
        title: metadata.title.clone(),
        transcript: transcript.as_ref().map(|t| t.text.clone()),
        style,
    };
    let summary = state
        .summarizer
        .summarize(&input)
        .await
        .map_err(|e| AppError::upstream(UpstreamStage::Summary, e))?;

    let new = NewSummary {
        user_id,
        video_url,
        video_title: &metadata.title,
        video_duration: metadata.duration,
        thumbnail_url: &metadata.thumbnail,
        channel_name: &metadata.channel,
        transcript: input.transcript.as_deref(),
        summary: &summary,
        language: transcript.as_ref().map(|t| t.language.as_str()),
        style,
    };

    // The atomic debit can still lose a race with a concurrent request that
    // spent the last credit since the gate above.
    let receipt = db::record_summary(&state.pool, &new)
        .await?
        .ok_or(AppError::QuotaExceeded)?;

    tracing::info!(
        summary_id = %receipt.summary_id,
        credits_remaining = receipt.credits_remaining,
        "Summary recorded"
    );

    Ok(Json(ProcessVideoResponse {
        success: true,
        summary_id: receipt.summary_id,
        summary,
        metadata,
        credits_remaining: receipt.credits_remaining,
    }))
}
