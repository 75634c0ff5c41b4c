//! Queries against the hosted database's `profiles` and `summaries` tables.
//!
//! The schema is owned by the hosted database; `migrations/` mirrors it for
//! local development and tests.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::summarize::SummaryStyle;

pub type DbPool = PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// A row from `profiles`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub credits_remaining: i32,
    pub tier: String,
}

/// Everything that goes into one `summaries` row.
#[derive(Debug)]
pub struct NewSummary<'a> {
    pub user_id: Uuid,
    pub video_url: &'a str,
    pub video_title: &'a str,
    pub video_duration: Option<i64>,
    pub thumbnail_url: &'a str,
    pub channel_name: &'a str,
    pub transcript: Option<&'a str>,
    pub summary: &'a str,
    pub language: Option<&'a str>,
    pub style: SummaryStyle,
}

/// Result of a successful debit + insert.
#[derive(Debug, Clone, Copy)]
pub struct SummaryReceipt {
    pub summary_id: Uuid,
    pub credits_remaining: i32,
}

/// Look up a profile by user id.
pub async fn find_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>("SELECT id, credits_remaining, tier FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Debit one credit and record the summary, atomically.
///
/// The decrement is conditional on a positive balance and runs in the same
/// transaction as the insert, so concurrent requests cannot overspend the
/// last credit and a summary row is never written without its debit.
/// Returns `None` when the balance was already exhausted.
pub async fn record_summary(
    pool: &PgPool,
    new: &NewSummary<'_>,
) -> Result<Option<SummaryReceipt>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let debited: Option<(i32,)> = sqlx::query_as(
        "UPDATE profiles \
         SET credits_remaining = credits_remaining - 1 \
         WHERE id = $1 AND credits_remaining > 0 \
         RETURNING credits_remaining",
    )
    .bind(new.user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((credits_remaining,)) = debited else {
        tx.rollback().await?;
        return Ok(None);
    };

    let (summary_id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO summaries (\
            user_id, video_url, video_title, video_duration, \
            thumbnail_url, channel_name, transcript, summary, \
            language, style\
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING id",
    )
    .bind(new.user_id)
    .bind(new.video_url)
    .bind(new.video_title)
    .bind(new.video_duration)
    .bind(new.thumbnail_url)
    .bind(new.channel_name)
    .bind(new.transcript)
    .bind(new.summary)
    .bind(new.language)
    .bind(new.style.as_str())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Some(SummaryReceipt {
        summary_id,
        credits_remaining,
    }))
}
