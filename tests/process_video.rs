//! Integration tests for the video-processing pipeline: validation, credit
//! gating, provider failures, persistence, and the atomic debit.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use common::{
    FakeProvider, FakeSummarizer, body_json, build_test_app, credits_of, default_test_app,
    post_json, seed_profile, summary_count,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use quicktube::db::{self, NewSummary};
use quicktube::summarize::SummaryStyle;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn missing_fields_return_400(pool: PgPool) {
    let app = default_test_app(pool);
    let response = post_json(
        app,
        "/api/process-video",
        json!({"video_url": "https://youtu.be/dQw4w9WgXcQ"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "video_url et user_id requis");
}

#[sqlx::test(migrations = "./migrations")]
async fn unparseable_url_returns_400(pool: PgPool) {
    let user_id = seed_profile(&pool, 5).await;
    let app = default_test_app(pool);
    let response = post_json(
        app,
        "/api/process-video",
        json!({"video_url": "https://vimeo.com/12345678", "user_id": user_id}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "URL YouTube invalide");
}

#[sqlx::test(migrations = "./migrations")]
async fn malformed_user_id_returns_400(pool: PgPool) {
    let app = default_test_app(pool);
    let response = post_json(
        app,
        "/api/process-video",
        json!({"video_url": "https://youtu.be/dQw4w9WgXcQ", "user_id": "not-a-uuid"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Credit gate
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn unknown_user_returns_404_before_any_provider_call(pool: PgPool) {
    let fetcher = Arc::new(FakeProvider::default());
    let summarizer = Arc::new(FakeSummarizer::default());
    let app = build_test_app(pool, fetcher.clone(), summarizer.clone());

    let response = post_json(
        app,
        "/api/process-video",
        json!({"video_url": "https://youtu.be/dQw4w9WgXcQ", "user_id": Uuid::new_v4()}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(fetcher.metadata_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fetcher.transcript_calls.load(Ordering::SeqCst), 0);
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn exhausted_credits_return_403_with_no_writes(pool: PgPool) {
    let user_id = seed_profile(&pool, 0).await;
    let fetcher = Arc::new(FakeProvider::default());
    let summarizer = Arc::new(FakeSummarizer::default());
    let app = build_test_app(pool.clone(), fetcher.clone(), summarizer.clone());

    let response = post_json(
        app,
        "/api/process-video",
        json!({"video_url": "https://youtu.be/dQw4w9WgXcQ", "user_id": user_id}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["code"], "QUOTA_EXCEEDED");
    assert_eq!(json["error"], "Crédits épuisés");

    assert_eq!(fetcher.metadata_calls.load(Ordering::SeqCst), 0);
    assert_eq!(summary_count(&pool, user_id).await, 0);
    assert_eq!(credits_of(&pool, user_id).await, 0);
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn successful_request_debits_one_credit(pool: PgPool) {
    let user_id = seed_profile(&pool, 3).await;
    let app = default_test_app(pool.clone());

    let response = post_json(
        app,
        "/api/process-video",
        json!({
            "video_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "user_id": user_id,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["credits_remaining"], 2);
    assert_eq!(json["metadata"]["title"], "Test Video");
    assert_eq!(json["metadata"]["channel"], "Test Channel");
    assert!(json["summary"].as_str().unwrap().starts_with("Résumé"));

    let summary_id: Uuid = json["summary_id"].as_str().unwrap().parse().unwrap();
    let (video_url, style): (String, String) =
        sqlx::query_as("SELECT video_url, style FROM summaries WHERE id = $1")
            .bind(summary_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(video_url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    assert_eq!(style, "structured");

    assert_eq!(credits_of(&pool, user_id).await, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn end_to_end_bullets_scenario(pool: PgPool) {
    let user_id = seed_profile(&pool, 5).await;
    let app = default_test_app(pool.clone());

    let video_url = "https://youtu.be/abc123XYZ-";
    let response = post_json(
        app,
        "/api/process-video",
        json!({"video_url": video_url, "user_id": user_id, "style": "bullets"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["credits_remaining"], 4);

    let (stored_url, style, language, transcript): (String, String, Option<String>, Option<String>) =
        sqlx::query_as(
            "SELECT video_url, style, language, transcript FROM summaries WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored_url, video_url);
    assert_eq!(style, "bullets");
    assert_eq!(language.as_deref(), Some("fr"));
    assert!(transcript.unwrap().contains("Bonjour"));
}

#[sqlx::test(migrations = "./migrations")]
async fn unknown_style_falls_back_to_structured(pool: PgPool) {
    let user_id = seed_profile(&pool, 2).await;
    let app = default_test_app(pool.clone());

    let response = post_json(
        app,
        "/api/process-video",
        json!({
            "video_url": "https://youtu.be/dQw4w9WgXcQ",
            "user_id": user_id,
            "style": "interpretive-dance",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    // The fake summarizer echoes the style it was asked for.
    assert_eq!(json["summary"], "Résumé de test (structured)");

    let (style,): (String,) = sqlx::query_as("SELECT style FROM summaries WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(style, "structured");
}

// ---------------------------------------------------------------------------
// Upstream failures
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn metadata_failure_returns_500_without_writes(pool: PgPool) {
    let user_id = seed_profile(&pool, 3).await;
    let app = build_test_app(
        pool.clone(),
        Arc::new(FakeProvider::failing_metadata()),
        Arc::new(FakeSummarizer::default()),
    );

    let response = post_json(
        app,
        "/api/process-video",
        json!({"video_url": "https://youtu.be/dQw4w9WgXcQ", "user_id": user_id}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UPSTREAM_ERROR");
    let message = json["error"].as_str().unwrap();
    assert!(message.starts_with("Infos vidéo échouées: "));
    assert!(message.contains("quota exceeded"));

    assert_eq!(summary_count(&pool, user_id).await, 0);
    assert_eq!(credits_of(&pool, user_id).await, 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn transcript_failure_returns_500(pool: PgPool) {
    let user_id = seed_profile(&pool, 3).await;
    let app = build_test_app(
        pool.clone(),
        Arc::new(FakeProvider::failing_transcript()),
        Arc::new(FakeSummarizer::default()),
    );

    let response = post_json(
        app,
        "/api/process-video",
        json!({"video_url": "https://youtu.be/dQw4w9WgXcQ", "user_id": user_id}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    let message = json["error"].as_str().unwrap();
    assert!(message.starts_with("Transcription échouée: "));
    assert!(message.contains("no captions available"));

    assert_eq!(credits_of(&pool, user_id).await, 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn summarizer_failure_returns_500_without_writes(pool: PgPool) {
    let user_id = seed_profile(&pool, 3).await;
    let app = build_test_app(
        pool.clone(),
        Arc::new(FakeProvider::default()),
        Arc::new(FakeSummarizer::failing()),
    );

    let response = post_json(
        app,
        "/api/process-video",
        json!({"video_url": "https://youtu.be/dQw4w9WgXcQ", "user_id": user_id}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().starts_with("Résumé échoué: "));

    assert_eq!(summary_count(&pool, user_id).await, 0);
    assert_eq!(credits_of(&pool, user_id).await, 3);
}

// ---------------------------------------------------------------------------
// Credit debit atomicity
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn conditional_debit_refuses_second_spend(pool: PgPool) {
    let user_id = seed_profile(&pool, 1).await;

    let new = NewSummary {
        user_id,
        video_url: "https://youtu.be/dQw4w9WgXcQ",
        video_title: "Test Video",
        video_duration: Some(120),
        thumbnail_url: "",
        channel_name: "",
        transcript: None,
        summary: "Résumé",
        language: None,
        style: SummaryStyle::Structured,
    };

    let first = db::record_summary(&pool, &new).await.unwrap();
    let second = db::record_summary(&pool, &new).await.unwrap();

    let receipt = first.expect("first spend must succeed");
    assert_eq!(receipt.credits_remaining, 0);
    assert!(second.is_none(), "second spend must be refused");

    assert_eq!(credits_of(&pool, user_id).await, 0);
    assert_eq!(summary_count(&pool, user_id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_requests_cannot_both_spend_last_credit(pool: PgPool) {
    let user_id = seed_profile(&pool, 1).await;
    let app = default_test_app(pool.clone());

    let body = json!({"video_url": "https://youtu.be/dQw4w9WgXcQ", "user_id": user_id});
    let (a, b) = tokio::join!(
        post_json(app.clone(), "/api/process-video", body.clone()),
        post_json(app, "/api/process-video", body),
    );

    let mut statuses = [a.status(), b.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::FORBIDDEN]);

    assert_eq!(credits_of(&pool, user_id).await, 0);
    assert_eq!(summary_count(&pool, user_id).await, 1);
}
