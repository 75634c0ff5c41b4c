//! yt-dlp backend: metadata via `--dump-json`, transcripts via subtitle
//! files written to a scratch directory and stripped of timing markup.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eyre::{Result, bail};
use log::{debug, warn};
use serde::Deserialize;
use tokio::process::Command;

use crate::fetch::VideoProvider;
use crate::youtube::lang_matches;
use crate::{TranscriptResult, VideoMetadata, subtitles};

pub struct YtDlpProvider {
    preferred_langs: Vec<String>,
}

impl YtDlpProvider {
    pub fn new(preferred_langs: Vec<String>) -> Self {
        Self { preferred_langs }
    }
}

#[async_trait]
impl VideoProvider for YtDlpProvider {
    /// Probe metadata, falling back to a placeholder on failure.
    ///
    /// A broken metadata probe must not fail the whole request; the
    /// transcript and summary stages still hard-fail on their own errors.
    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata> {
        match probe_metadata(video_id).await {
            Ok(metadata) => Ok(metadata),
            Err(e) => {
                warn!("yt-dlp metadata probe failed for {video_id}: {e}");
                Ok(VideoMetadata::placeholder())
            }
        }
    }

    async fn fetch_transcript(&self, video_id: &str) -> Result<Option<TranscriptResult>> {
        let transcript = fetch_subtitles(video_id, &self.preferred_langs).await?;
        Ok(Some(transcript))
    }
}

#[derive(Debug, Deserialize)]
struct DumpInfo {
    title: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    view_count: Option<i64>,
    upload_date: Option<String>,
}

async fn probe_metadata(video_id: &str) -> Result<VideoMetadata> {
    let url = format!("https://www.youtube.com/watch?v={video_id}");
    debug!("Probing metadata via yt-dlp: {url}");

    let output = Command::new("yt-dlp")
        .args(["--dump-json", "--skip-download", "--no-playlist", "--no-warnings", &url])
        .output()
        .await;

    let output = match output {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            bail!(
                "yt-dlp not found. Install it to enable the yt-dlp backend:\n  \
                 pip install yt-dlp\n  \
                 or: brew install yt-dlp"
            );
        }
        Err(e) => bail!("failed to run yt-dlp: {e}"),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("yt-dlp exited with {}: {}", output.status, stderr.trim());
    }

    let info: DumpInfo = serde_json::from_slice(&output.stdout)?;

    Ok(VideoMetadata {
        title: info.title.unwrap_or_default(),
        channel: info.channel.or(info.uploader).unwrap_or_default(),
        thumbnail: info.thumbnail.unwrap_or_default(),
        duration: info.duration.map(|d| d.round() as i64),
        view_count: info.view_count,
        upload_date: info.upload_date,
    })
}

/// Download subtitle tracks into a temp dir and reduce the best one to text.
///
/// Both human-authored and auto-generated tracks are requested; when a
/// language has both, yt-dlp writes the manual track.
async fn fetch_subtitles(video_id: &str, preferred_langs: &[String]) -> Result<TranscriptResult> {
    let url = format!("https://www.youtube.com/watch?v={video_id}");
    let langs_arg = if preferred_langs.is_empty() {
        "fr,en".to_string()
    } else {
        preferred_langs.join(",")
    };

    let scratch = tempfile::tempdir()?;
    let out_template = scratch.path().join("%(id)s.%(ext)s");

    debug!("Fetching subtitles via yt-dlp: {url} (langs: {langs_arg})");

    let output = Command::new("yt-dlp")
        .args([
            "--skip-download",
            "--write-sub",
            "--write-auto-sub",
            "--sub-lang",
            &langs_arg,
            "--sub-format",
            "vtt/json3",
            "--no-playlist",
            "--no-warnings",
            "-o",
        ])
        .arg(&out_template)
        .arg(&url)
        .output()
        .await;

    let output = match output {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            bail!(
                "yt-dlp not found. Install it to enable the yt-dlp backend:\n  \
                 pip install yt-dlp\n  \
                 or: brew install yt-dlp"
            );
        }
        Err(e) => bail!("failed to run yt-dlp: {e}"),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("yt-dlp exited with {}: {}", output.status, stderr.trim());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(scratch.path())?
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| subtitle_lang(p).is_some())
        .collect();
    files.sort();

    let Some(path) = pick_subtitle(&files, preferred_langs) else {
        bail!("no captions available for video {video_id}");
    };
    let language = subtitle_lang(path).unwrap_or_default();
    debug!("Using subtitle file: {}", path.display());

    let payload = std::fs::read_to_string(path)?;
    let segments = subtitles::parse(&payload)?;
    if segments.is_empty() {
        bail!("subtitle file for video {video_id} contained no text");
    }

    Ok(TranscriptResult {
        text: subtitles::plain_text(&segments),
        language: language.split('-').next().unwrap_or(&language).to_string(),
    })
}

/// Language tag from a yt-dlp subtitle filename (`<id>.<lang>.<ext>`).
fn subtitle_lang(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let mut parts: Vec<&str> = name.split('.').collect();
    let ext = parts.pop()?;
    if !matches!(ext, "vtt" | "json3" | "srv3") {
        return None;
    }
    // <id>.<lang>.<ext> leaves at least two parts once the extension is gone.
    if parts.len() < 2 {
        return None;
    }
    Some(parts.pop()?.to_string())
}

/// Choose the subtitle file matching the language preference order, falling
/// back to the first file.
fn pick_subtitle<'a>(files: &'a [PathBuf], preferred_langs: &[String]) -> Option<&'a PathBuf> {
    for lang in preferred_langs {
        if let Some(path) = files.iter().find(|p| {
            subtitle_lang(p).is_some_and(|code| lang_matches(&code, lang))
        }) {
            return Some(path);
        }
    }
    files.first()
}
