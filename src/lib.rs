pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod routes;
pub mod state;
pub mod subtitles;
pub mod summarize;
pub mod youtube;
pub mod ytdlp;

use serde::Serialize;

/// Video metadata as reported by the upstream provider.
///
/// Fields are best-effort: providers that cannot supply a value leave the
/// optional fields empty, and the yt-dlp backend falls back to a placeholder
/// when its metadata probe fails.
#[derive(Debug, Clone, Serialize)]
pub struct VideoMetadata {
    pub title: String,
    pub channel: String,
    pub thumbnail: String,
    pub duration: Option<i64>,
    pub view_count: Option<i64>,
    pub upload_date: Option<String>,
}

impl VideoMetadata {
    /// Placeholder used when a backend tolerates a failed metadata probe.
    pub fn placeholder() -> Self {
        Self {
            title: "Titre indisponible".to_string(),
            channel: String::new(),
            thumbnail: String::new(),
            duration: None,
            view_count: None,
            upload_date: None,
        }
    }
}

/// A fetched transcript: flattened text plus the caption track's language tag.
#[derive(Debug, Clone)]
pub struct TranscriptResult {
    pub text: String,
    pub language: String,
}

/// Extract video ID from various YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    // Bare 11-character video ID
    if regex::Regex::new(r"^[a-zA-Z0-9_-]{11}$").unwrap().is_match(input) {
        return Some(input.to_string());
    }

    // youtube.com/watch?v=ID
    if let Some(caps) = regex::Regex::new(r"youtube\.com/watch\?.*v=([^&\n?#]+)")
        .unwrap()
        .captures(input)
    {
        return Some(caps[1].to_string());
    }

    // youtu.be/ID
    if let Some(caps) = regex::Regex::new(r"youtu\.be/([^&\n?#/]+)")
        .unwrap()
        .captures(input)
    {
        return Some(caps[1].to_string());
    }

    // youtube.com/embed/ID
    if let Some(caps) = regex::Regex::new(r"youtube\.com/embed/([^&\n?#/]+)")
        .unwrap()
        .captures(input)
    {
        return Some(caps[1].to_string());
    }

    // youtube.com/v/ID (legacy player URLs)
    if let Some(caps) = regex::Regex::new(r"youtube\.com/v/([^&\n?#/]+)")
        .unwrap()
        .captures(input)
    {
        return Some(caps[1].to_string());
    }

    // youtube.com/shorts/ID
    if let Some(caps) = regex::Regex::new(r"youtube\.com/shorts/([^&\n?#/]+)")
        .unwrap()
        .captures(input)
    {
        return Some(caps[1].to_string());
    }

    None
}
