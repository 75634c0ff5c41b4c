use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::DbPool;
use crate::fetch::VideoProvider;
use crate::summarize::Summarizer;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Provider clients are trait objects constructed once at startup; tests
/// inject fakes through the same fields.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Metadata/transcript provider.
    pub fetcher: Arc<dyn VideoProvider>,
    /// Text-generation provider.
    pub summarizer: Arc<dyn Summarizer>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
