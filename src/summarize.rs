//! Summary generation: prompt templates per style, dispatched to OpenAI or
//! Gemini depending on the configured model name.

use async_trait::async_trait;
use eyre::{Result, bail};
use log::debug;

const SYSTEM_PROMPT: &str = "Tu es expert en résumé de vidéos.";

/// Character budget applied to the transcript before prompting, unless
/// overridden in the tunables file. Longer transcripts are silently cut.
pub const DEFAULT_CHAR_BUDGET: usize = 4000;

const TEMPERATURE: f64 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 1000;

/// Requested summary rendering style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SummaryStyle {
    #[default]
    Structured,
    Bullets,
    Paragraph,
}

impl SummaryStyle {
    /// Parse a client-supplied style string.
    ///
    /// Unrecognized values fall back to `Structured`; the frontend treats
    /// the style as a soft preference, not a contract.
    pub fn parse(style: Option<&str>) -> Self {
        match style {
            Some("bullets") => SummaryStyle::Bullets,
            Some("paragraph") => SummaryStyle::Paragraph,
            _ => SummaryStyle::Structured,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStyle::Structured => "structured",
            SummaryStyle::Bullets => "bullets",
            SummaryStyle::Paragraph => "paragraph",
        }
    }
}

impl std::fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the summarizer needs from the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct SummaryInput {
    pub video_url: String,
    pub title: String,
    pub transcript: Option<String>,
    pub style: SummaryStyle,
}

/// Text-generation provider seam; the HTTP handler only sees this trait so
/// tests can substitute a fake.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, input: &SummaryInput) -> Result<String>;
}

/// Truncate to a whole-character budget.
fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build the prompt for a style.
///
/// Templates are fixed; only the title and the source block (truncated
/// transcript, or the bare URL when no transcript exists) vary.
pub fn build_prompt(input: &SummaryInput, char_budget: usize) -> String {
    let source = match &input.transcript {
        Some(transcript) => format!("TRANSCRIPTION:\n{}", truncate_chars(transcript, char_budget)),
        // No transcript backend configured: the model reasons from the URL.
        None => format!("VIDÉO (aucune transcription disponible):\n{}", input.video_url),
    };
    let title = &input.title;

    match input.style {
        SummaryStyle::Structured => format!(
            "Analyse cette transcription et crée un résumé structuré en français.\n\n\
             Titre: {title}\n\n\
             {source}\n\n\
             FORMAT:\n\
             ## 📝 Résumé Principal\n\
             [2-3 phrases]\n\n\
             ## 🎯 Points Clés\n\
             - Point 1\n\
             - Point 2\n\
             - Point 3\n\n\
             ## 💡 Idées Principales\n\
             [Développement]\n\n\
             ## 🔑 Conclusion\n\
             [Takeaway]"
        ),
        SummaryStyle::Bullets => format!(
            "Résume en bullet points en français.\n\n\
             Titre: {title}\n\n\
             {source}\n\n\
             5-7 points clés."
        ),
        SummaryStyle::Paragraph => format!(
            "Résumé en paragraphe fluide en français.\n\n\
             Titre: {title}\n\n\
             {source}\n\n\
             1 paragraphe de 4-6 phrases."
        ),
    }
}

/// Summarizer backed by a hosted LLM API, selected by model name.
pub struct LlmSummarizer {
    http: reqwest::Client,
    model: String,
    api_key: String,
    char_budget: usize,
}

impl LlmSummarizer {
    pub fn new(http: reqwest::Client, model: String, api_key: String, char_budget: usize) -> Self {
        Self {
            http,
            model,
            api_key,
            char_budget,
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, input: &SummaryInput) -> Result<String> {
        let prompt = build_prompt(input, self.char_budget);

        if is_gemini_model(&self.model) {
            summarize_gemini(&self.http, &self.api_key, &self.model, &prompt).await
        } else {
            summarize_openai(&self.http, &self.api_key, &self.model, &prompt).await
        }
    }
}

pub fn is_gemini_model(model: &str) -> bool {
    model.starts_with("gemini")
}

async fn summarize_openai(
    client: &reqwest::Client,
    api_key: &str,
    model: &str,
    prompt: &str,
) -> Result<String> {
    debug!("Summarizing via OpenAI API with model {model}");

    let body = serde_json::json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": SYSTEM_PROMPT
            },
            {
                "role": "user",
                "content": prompt
            }
        ],
        "temperature": TEMPERATURE,
        "max_tokens": MAX_OUTPUT_TOKENS
    });

    let resp = client
        .post("https://api.openai.com/v1/chat/completions")
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("OpenAI API returned {status}: {body}");
    }

    let json: serde_json::Value = resp.json().await?;
    extract_openai_text(&json)
}

fn extract_openai_text(json: &serde_json::Value) -> Result<String> {
    if let Some(text) = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
    {
        return Ok(text.to_string());
    }
    bail!("unexpected OpenAI API response format");
}

async fn summarize_gemini(
    client: &reqwest::Client,
    api_key: &str,
    model: &str,
    prompt: &str,
) -> Result<String> {
    debug!("Summarizing via Gemini API with model {model}");

    let url = format!(
        "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent?key={api_key}"
    );

    let body = serde_json::json!({
        "system_instruction": {
            "parts": [{"text": SYSTEM_PROMPT}]
        },
        "contents": [
            {
                "parts": [{"text": prompt}]
            }
        ],
        "generationConfig": {
            "temperature": TEMPERATURE,
            "maxOutputTokens": MAX_OUTPUT_TOKENS
        }
    });

    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("Gemini API returned {status}: {body}");
    }

    let json: serde_json::Value = resp.json().await?;
    extract_gemini_text(&json)
}

fn extract_gemini_text(json: &serde_json::Value) -> Result<String> {
    if let Some(parts) = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
    {
        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text")?.as_str().map(|s| s.to_string()))
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Ok(text);
        }
    }
    bail!("unexpected Gemini API response format");
}
