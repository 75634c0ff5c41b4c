//! Provider seam between the request pipeline and the upstream video
//! services. Each backend renders one of the service's historical revisions;
//! the handler only ever sees the trait.

use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;

use crate::config::Tunables;
use crate::youtube::YouTubeClient;
use crate::ytdlp::YtDlpProvider;
use crate::{TranscriptResult, VideoMetadata};

/// Which upstream stack supplies metadata and transcripts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TranscriptBackend {
    /// YouTube Data API metadata + InnerTube caption content.
    #[default]
    DataApi,
    /// yt-dlp subprocess for metadata and subtitle files.
    YtDlp,
    /// Metadata only; the summarizer reasons from the URL.
    MetadataOnly,
}

impl TranscriptBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "data-api" => Some(TranscriptBackend::DataApi),
            "yt-dlp" => Some(TranscriptBackend::YtDlp),
            "metadata-only" => Some(TranscriptBackend::MetadataOnly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptBackend::DataApi => "data-api",
            TranscriptBackend::YtDlp => "yt-dlp",
            TranscriptBackend::MetadataOnly => "metadata-only",
        }
    }
}

/// Metadata/transcript provider seam.
///
/// The two stages are separate calls so the handler can report which stage
/// an upstream failure came from.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata>;

    /// `Ok(None)` means the backend deliberately produces no transcript.
    async fn fetch_transcript(&self, video_id: &str) -> Result<Option<TranscriptResult>>;
}

/// Data API backend: official metadata, InnerTube captions.
pub struct DataApiProvider {
    client: YouTubeClient,
    preferred_langs: Vec<String>,
}

#[async_trait]
impl VideoProvider for DataApiProvider {
    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata> {
        self.client.fetch_metadata(video_id).await
    }

    async fn fetch_transcript(&self, video_id: &str) -> Result<Option<TranscriptResult>> {
        let transcript = self.client.fetch_transcript(video_id, &self.preferred_langs).await?;
        Ok(Some(transcript))
    }
}

/// Metadata-only backend: no transcript stage at all.
pub struct MetadataOnlyProvider {
    client: YouTubeClient,
}

#[async_trait]
impl VideoProvider for MetadataOnlyProvider {
    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata> {
        self.client.fetch_metadata(video_id).await
    }

    async fn fetch_transcript(&self, _video_id: &str) -> Result<Option<TranscriptResult>> {
        Ok(None)
    }
}

/// Build the configured provider.
pub fn build_provider(
    http: reqwest::Client,
    youtube_api_key: String,
    tunables: &Tunables,
) -> Arc<dyn VideoProvider> {
    let preferred_langs = tunables.preferred_langs.clone();
    match tunables.transcript_backend {
        TranscriptBackend::DataApi => Arc::new(DataApiProvider {
            client: YouTubeClient::new(http, youtube_api_key),
            preferred_langs,
        }),
        TranscriptBackend::YtDlp => Arc::new(YtDlpProvider::new(preferred_langs)),
        TranscriptBackend::MetadataOnly => Arc::new(MetadataOnlyProvider {
            client: YouTubeClient::new(http, youtube_api_key),
        }),
    }
}
