//! Configuration: required secrets come from the environment (the process
//! refuses to start without them); behaviour tunables come from an optional
//! TOML file with env overrides.

use std::path::PathBuf;

use eyre::{Result, bail};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::fetch::TranscriptBackend;
use crate::summarize::{self, DEFAULT_CHAR_BUDGET};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SUMMARY_MODEL: &str = "gpt-4";

/// Raw shape of `~/.config/quicktube/config.toml`.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TunablesFile {
    pub summary_model: Option<String>,
    pub transcript_backend: Option<String>,
    pub transcript_char_budget: Option<usize>,
    pub preferred_langs: Option<Vec<String>>,
}

/// Resolved behaviour tunables.
#[derive(Debug, Clone)]
pub struct Tunables {
    pub summary_model: String,
    pub transcript_backend: TranscriptBackend,
    pub transcript_char_budget: usize,
    pub preferred_langs: Vec<String>,
}

impl Default for Tunables {
    fn default() -> Self {
        Self::resolve(TunablesFile::default())
    }
}

impl Tunables {
    /// Load tunables from the config file if it exists, then apply env
    /// overrides (`SUMMARY_MODEL`, `TRANSCRIPT_BACKEND`). Missing or invalid
    /// files are non-fatal.
    pub fn load() -> Self {
        let file = read_tunables_file().unwrap_or_default();
        let mut tunables = Self::resolve(file);

        if let Ok(model) = std::env::var("SUMMARY_MODEL") {
            let model = model.trim();
            if !model.is_empty() {
                tunables.summary_model = model.to_string();
            }
        }
        if let Ok(backend) = std::env::var("TRANSCRIPT_BACKEND") {
            let backend = backend.trim();
            if !backend.is_empty() {
                match TranscriptBackend::parse(backend) {
                    Some(parsed) => tunables.transcript_backend = parsed,
                    None => warn!(
                        "Unknown TRANSCRIPT_BACKEND {backend:?}, keeping {}",
                        tunables.transcript_backend.as_str()
                    ),
                }
            }
        }

        tunables
    }

    fn resolve(file: TunablesFile) -> Self {
        let transcript_backend = match file.transcript_backend.as_deref() {
            None => TranscriptBackend::default(),
            Some(raw) => TranscriptBackend::parse(raw).unwrap_or_else(|| {
                warn!("Unknown transcript_backend {raw:?} in config file, using data-api");
                TranscriptBackend::default()
            }),
        };

        let preferred_langs = file
            .preferred_langs
            .filter(|langs| !langs.is_empty())
            .unwrap_or_else(|| vec!["fr".to_string(), "en".to_string()]);

        Self {
            summary_model: file.summary_model.unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string()),
            transcript_backend,
            transcript_char_budget: file.transcript_char_budget.unwrap_or(DEFAULT_CHAR_BUDGET),
            preferred_langs,
        }
    }
}

fn read_tunables_file() -> Option<TunablesFile> {
    let path = config_path();
    if !path.exists() {
        debug!("No config file found at {}", path.display());
        return None;
    }
    debug!("Loading config from {}", path.display());
    let content = std::fs::read_to_string(&path).ok()?;
    match toml::from_str(&content) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!("Ignoring invalid config file {}: {e}", path.display());
            None
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("quicktube")
        .join("config.toml")
}

/// Startup configuration. Construction fails (and the process exits with
/// status 1) when any required secret is unset.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub database_url: String,
    pub youtube_api_key: String,
    pub llm_api_key: String,
    pub tunables: Tunables,
}

impl ServerConfig {
    /// Read configuration from the environment.
    ///
    /// | Env var           | Required                                  |
    /// |-------------------|-------------------------------------------|
    /// | `DATABASE_URL`    | always                                    |
    /// | `YOUTUBE_API_KEY` | unless the yt-dlp backend is configured   |
    /// | `OPENAI_API_KEY`  | when the summary model is an OpenAI model |
    /// | `GEMINI_API_KEY`  | when the summary model is a Gemini model  |
    /// | `PORT`            | no (default 8080)                         |
    /// | `ALLOWED_ORIGINS` | no (default `*`)                          |
    pub fn from_env() -> Result<Self> {
        let tunables = Tunables::load();

        let mut missing = Vec::new();
        let database_url = require(&mut missing, "DATABASE_URL");

        let youtube_api_key = if tunables.transcript_backend == TranscriptBackend::YtDlp {
            std::env::var("YOUTUBE_API_KEY").unwrap_or_default()
        } else {
            require(&mut missing, "YOUTUBE_API_KEY")
        };

        let llm_key_var = if summarize::is_gemini_model(&tunables.summary_model) {
            "GEMINI_API_KEY"
        } else {
            "OPENAI_API_KEY"
        };
        let llm_api_key = require(&mut missing, llm_key_var);

        if !missing.is_empty() {
            bail!("missing required environment variables: {}", missing.join(", "));
        }

        let port: u16 = match std::env::var("PORT") {
            Ok(raw) => match raw.parse() {
                Ok(port) => port,
                Err(_) => bail!("PORT must be a valid port number, got {raw:?}"),
            },
            Err(_) => DEFAULT_PORT,
        };

        let allowed_origins =
            parse_origins(&std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()));

        Ok(Self {
            port,
            allowed_origins,
            database_url,
            youtube_api_key,
            llm_api_key,
            tunables,
        })
    }

    /// Wildcard CORS applies when no explicit origin list is configured.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn require(missing: &mut Vec<&'static str>, var: &'static str) -> String {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => {
            missing.push(var);
            String::new()
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
