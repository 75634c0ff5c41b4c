//! Caption payload parsers.
//!
//! YouTube serves captions in three wire formats depending on how they are
//! fetched: timedtext XML (InnerTube), WebVTT and JSON3 (yt-dlp subtitle
//! files). Each parser reduces a payload to timed segments; `plain_text`
//! flattens segments into the transcript string that gets summarized and
//! persisted.

use eyre::{Result, bail};
use serde::Deserialize;

/// A single captioned segment
#[derive(Debug, Clone)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Caption wire formats this service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionFormat {
    TimedText,
    WebVtt,
    Json3,
}

/// Join segments into the flat transcript text.
pub fn plain_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sniff the caption format from the payload itself.
///
/// yt-dlp names output files after the requested format but the served body
/// is authoritative, so sniff content rather than trusting extensions.
pub fn detect_format(payload: &str) -> Option<CaptionFormat> {
    let head = payload.trim_start();
    if head.starts_with("WEBVTT") {
        Some(CaptionFormat::WebVtt)
    } else if head.starts_with('{') {
        Some(CaptionFormat::Json3)
    } else if head.starts_with('<') {
        Some(CaptionFormat::TimedText)
    } else {
        None
    }
}

/// Parse a caption payload of any supported format.
pub fn parse(payload: &str) -> Result<Vec<Segment>> {
    match detect_format(payload) {
        Some(CaptionFormat::TimedText) => parse_timedtext(payload),
        Some(CaptionFormat::WebVtt) => parse_webvtt(payload),
        Some(CaptionFormat::Json3) => parse_json3(payload),
        None => bail!("unrecognized caption payload format"),
    }
}

/// Parse YouTube timedtext XML (`<transcript><text start dur>...`).
pub fn parse_timedtext(xml: &str) -> Result<Vec<Segment>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current_start: Option<f64> = None;
    let mut current_dur: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = None;
                let mut dur = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"start" => {
                            start = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        b"dur" => {
                            dur = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        _ => {}
                    }
                }
                current_start = start;
                current_dur = dur;
            }
            Ok(Event::Empty(_)) => {
                // Self-closing <text .../> with no content — skip
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(start), Some(dur)) = (current_start.take(), current_dur.take()) {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    let text = html_escape::decode_html_entities(&raw_text).to_string();
                    if !text.is_empty() {
                        segments.push(Segment {
                            text,
                            start,
                            duration: dur,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("error parsing timedtext XML: {e}"),
            _ => {}
        }
    }

    Ok(segments)
}

/// Parse a WebVTT payload into segments.
///
/// Recognizes the WEBVTT header, numeric cue identifiers, and timing lines
/// (`HH:MM:SS.mmm --> HH:MM:SS.mmm`); everything else inside a cue is text.
/// Inline styling tags and rolling-caption repeats are dropped.
pub fn parse_webvtt(vtt: &str) -> Result<Vec<Segment>> {
    let tag_re = regex::Regex::new(r"<[^>]*>").unwrap();

    let mut segments: Vec<Segment> = Vec::new();
    let mut current: Option<(f64, f64)> = None;

    for line in vtt.lines() {
        let l = line.trim();
        if l.is_empty() {
            current = None;
            continue;
        }
        if l.starts_with("WEBVTT") || l.starts_with("Kind:") || l.starts_with("Language:") {
            continue;
        }
        if let Some((start, end)) = parse_cue_timing(l) {
            current = Some((start, end));
            continue;
        }
        // ignore numeric cue ids
        if l.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let Some((start, end)) = current else {
            continue;
        };

        let stripped = tag_re.replace_all(l, "");
        let text = html_escape::decode_html_entities(stripped.trim()).to_string();
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            continue;
        }
        // Auto-generated tracks repeat the previous line in each rolling cue.
        if segments.last().map(|s: &Segment| s.text.as_str()) == Some(text.as_str()) {
            continue;
        }
        segments.push(Segment {
            text,
            start,
            duration: (end - start).max(0.0),
        });
    }

    Ok(segments)
}

/// Parse a `HH:MM:SS.mmm --> HH:MM:SS.mmm` cue timing line.
///
/// The hours field is optional per the WebVTT grammar. Trailing cue settings
/// (`align:start position:0%`) are ignored.
fn parse_cue_timing(line: &str) -> Option<(f64, f64)> {
    let (lhs, rhs) = line.split_once("-->")?;
    let start = parse_vtt_timestamp(lhs.trim())?;
    let end_token = rhs.trim().split_whitespace().next()?;
    let end = parse_vtt_timestamp(end_token)?;
    Some((start, end))
}

fn parse_vtt_timestamp(ts: &str) -> Option<f64> {
    let (clock, millis) = ts.split_once('.')?;
    let millis: f64 = millis.parse().ok()?;
    let parts: Vec<&str> = clock.split(':').collect();
    let (h, m, s) = match parts.as_slice() {
        [h, m, s] => (h.parse::<f64>().ok()?, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        [m, s] => (0.0, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        _ => return None,
    };
    Some(h * 3600.0 + m * 60.0 + s + millis / 1000.0)
}

#[derive(Debug, Deserialize)]
struct Json3Payload {
    events: Option<Vec<Json3Event>>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs")]
    t_start_ms: Option<f64>,
    #[serde(rename = "dDurationMs")]
    d_duration_ms: Option<f64>,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    utf8: Option<String>,
}

/// Parse a JSON3 payload (`{"events":[{"tStartMs":..,"segs":[{"utf8":..}]}]}`).
pub fn parse_json3(json: &str) -> Result<Vec<Segment>> {
    let payload: Json3Payload = serde_json::from_str(json)?;

    let segments = payload
        .events
        .unwrap_or_default()
        .into_iter()
        .filter_map(|event| {
            let text = event
                .segs?
                .into_iter()
                .filter_map(|seg| seg.utf8)
                .collect::<String>();
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                return None;
            }
            Some(Segment {
                text,
                start: event.t_start_ms.unwrap_or(0.0) / 1000.0,
                duration: event.d_duration_ms.unwrap_or(0.0) / 1000.0,
            })
        })
        .collect();

    Ok(segments)
}
