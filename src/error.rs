//! Application-level error type for HTTP handlers.
//!
//! Every failure in the pipeline funnels into [`AppError`], which implements
//! [`IntoResponse`] to produce consistent `{"error", "code"}` JSON bodies.
//! Upstream provider failures carry the pipeline stage so the response names
//! where the request died.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

/// Pipeline stage an upstream failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamStage {
    Metadata,
    Transcript,
    Summary,
}

impl UpstreamStage {
    /// User-facing failure label, matching the service's French responses.
    fn label(&self) -> &'static str {
        match self {
            UpstreamStage::Metadata => "Infos vidéo échouées",
            UpstreamStage::Transcript => "Transcription échouée",
            UpstreamStage::Summary => "Résumé échoué",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or malformed request input.
    #[error("{0}")]
    Validation(String),

    /// No profile row for the requested user.
    #[error("Utilisateur non trouvé")]
    UserNotFound(Uuid),

    /// The user's credit balance is exhausted.
    #[error("Crédits épuisés")]
    QuotaExceeded,

    /// A provider call failed at the given pipeline stage.
    #[error("{}: {}", .stage.label(), .err)]
    Upstream {
        stage: UpstreamStage,
        err: eyre::Report,
    },

    /// A database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Anything else; detail stays server-side.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn upstream(stage: UpstreamStage, err: eyre::Report) -> Self {
        AppError::Upstream { stage, err }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UserNotFound(user_id) => {
                tracing::info!(%user_id, "Unknown user");
                (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string())
            }
            AppError::QuotaExceeded => (StatusCode::FORBIDDEN, "QUOTA_EXCEEDED", self.to_string()),
            AppError::Upstream { stage, err } => {
                tracing::error!(stage = ?stage, error = %err, "Upstream provider failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_ERROR", self.to_string())
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Erreur serveur".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Erreur serveur".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
