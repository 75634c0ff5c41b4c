//! Shared test harness: fake providers and a router builder mirroring the
//! production middleware stack.

// Each test binary compiles this module separately and uses a subset of it.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, Response};
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use quicktube::config::{ServerConfig, Tunables};
use quicktube::fetch::VideoProvider;
use quicktube::routes;
use quicktube::state::AppState;
use quicktube::summarize::{SummaryInput, Summarizer};
use quicktube::{TranscriptResult, VideoMetadata};

/// Fake metadata/transcript provider with call counters.
#[derive(Default)]
pub struct FakeProvider {
    pub metadata_calls: AtomicUsize,
    pub transcript_calls: AtomicUsize,
    pub fail_metadata: bool,
    pub fail_transcript: bool,
}

impl FakeProvider {
    pub fn failing_metadata() -> Self {
        Self {
            fail_metadata: true,
            ..Default::default()
        }
    }

    pub fn failing_transcript() -> Self {
        Self {
            fail_transcript: true,
            ..Default::default()
        }
    }
}

pub fn sample_metadata() -> VideoMetadata {
    VideoMetadata {
        title: "Test Video".to_string(),
        channel: "Test Channel".to_string(),
        thumbnail: "https://i.ytimg.com/vi/test/hqdefault.jpg".to_string(),
        duration: Some(120),
        view_count: Some(1000),
        upload_date: Some("2024-05-01T12:00:00Z".to_string()),
    }
}

#[async_trait]
impl VideoProvider for FakeProvider {
    async fn fetch_metadata(&self, _video_id: &str) -> eyre::Result<VideoMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_metadata {
            eyre::bail!("quota exceeded for quota metric 'queries'");
        }
        Ok(sample_metadata())
    }

    async fn fetch_transcript(&self, _video_id: &str) -> eyre::Result<Option<TranscriptResult>> {
        self.transcript_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_transcript {
            eyre::bail!("no captions available for video");
        }
        Ok(Some(TranscriptResult {
            text: "Bonjour et bienvenue dans cette vidéo de test.".to_string(),
            language: "fr".to_string(),
        }))
    }
}

/// Fake summarizer echoing the requested style.
#[derive(Default)]
pub struct FakeSummarizer {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl FakeSummarizer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, input: &SummaryInput) -> eyre::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            eyre::bail!("model overloaded");
        }
        Ok(format!("Résumé de test ({})", input.style))
    }
}

/// Build a test `ServerConfig` with safe defaults and wildcard CORS.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        port: 0,
        allowed_origins: vec!["*".to_string()],
        database_url: String::new(),
        youtube_api_key: "test-youtube-key".to_string(),
        llm_api_key: "test-llm-key".to_string(),
        tunables: Tunables::default(),
    }
}

/// Build the full application router with the production middleware layers,
/// using the given pool and fake providers.
pub fn build_test_app(
    pool: PgPool,
    fetcher: Arc<dyn VideoProvider>,
    summarizer: Arc<dyn Summarizer>,
) -> Router {
    let state = AppState {
        pool,
        fetcher,
        summarizer,
        config: Arc::new(test_config()),
    };

    let request_id_header = HeaderName::from_static("x-request-id");

    routes::router()
        .layer(CatchPanicLayer::new())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Router wired with default (succeeding) fakes.
pub fn default_test_app(pool: PgPool) -> Router {
    build_test_app(
        pool,
        Arc::new(FakeProvider::default()),
        Arc::new(FakeSummarizer::default()),
    )
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Insert a profile with the given balance, returning its id.
pub async fn seed_profile(pool: &PgPool, credits: i32) -> Uuid {
    let (id,): (Uuid,) =
        sqlx::query_as("INSERT INTO profiles (credits_remaining, tier) VALUES ($1, 'free') RETURNING id")
            .bind(credits)
            .fetch_one(pool)
            .await
            .unwrap();
    id
}

/// Current balance for a profile.
pub async fn credits_of(pool: &PgPool, user_id: Uuid) -> i32 {
    let (credits,): (i32,) =
        sqlx::query_as("SELECT credits_remaining FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap();
    credits
}

/// Number of summary rows for a profile.
pub async fn summary_count(pool: &PgPool, user_id: Uuid) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM summaries WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap();
    count
}
