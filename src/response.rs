/*!
 * Parsing of raw model responses into per-line translations.
 *
 * The parser is deliberately forgiving: it extracts whatever numbered
 * markers it can find and reports them as-is, including duplicates and
 * gaps. Deciding whether the result satisfies the alignment contract is
 * the validator's job, not the parser's. The only intrinsic failure is a
 * response with no recognizable markers at all.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ParseError;

static MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*#(\d+)\s*$").expect("marker regex is valid"));

static SUMMARY_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<summary>\s*(.*?)\s*</summary>").expect("summary regex is valid"));

static SCENE_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<scene>\s*(.*?)\s*</scene>").expect("scene regex is valid"));

/// One translated line as reported by the model
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationEntry {
    /// The line index echoed back by the model
    pub index: usize,

    /// The translated text associated with the marker
    pub text: String,
}

/// Everything extracted from one raw response
#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    /// Per-line translations in the order the model produced them
    pub entries: Vec<TranslationEntry>,

    /// Content of the `<summary>` tag, or empty if the model omitted it
    pub summary: String,

    /// Content of the `<scene>` tag, or empty if the model omitted it
    pub scene: String,
}

/// Parse a raw model response.
///
/// Returns [`ParseError::MalformedResponse`] only when no numbered marker
/// is recognized anywhere in the text.
pub fn parse_response(raw: &str) -> Result<ParsedResponse, ParseError> {
    let summary = extract_tag(&SUMMARY_TAG_REGEX, raw);
    let scene = extract_tag(&SCENE_TAG_REGEX, raw);

    // Strip the trailing tags so they cannot bleed into the last translation
    let body = SCENE_TAG_REGEX.replace_all(raw, "");
    let body = SUMMARY_TAG_REGEX.replace_all(&body, "");

    let markers: Vec<(usize, usize, usize)> = MARKER_REGEX
        .captures_iter(&body)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let index: usize = caps.get(1)?.as_str().parse().ok()?;
            Some((index, whole.start(), whole.end()))
        })
        .collect();

    if markers.is_empty() {
        return Err(ParseError::MalformedResponse);
    }

    let mut entries = Vec::with_capacity(markers.len());
    for (position, &(index, _, segment_start)) in markers.iter().enumerate() {
        let segment_end = markers
            .get(position + 1)
            .map(|&(_, next_start, _)| next_start)
            .unwrap_or(body.len());
        let segment = &body[segment_start..segment_end];

        entries.push(TranslationEntry {
            index,
            text: extract_translation(segment),
        });
    }

    debug!(
        "Parsed {} translation entries (summary: {}, scene: {})",
        entries.len(),
        !summary.is_empty(),
        !scene.is_empty()
    );

    Ok(ParsedResponse { entries, summary, scene })
}

/// Pull the translated text out of one marker's segment.
///
/// Well-behaved responses echo the `Original>`/`Translation>` labels, in
/// which case the text after `Translation>` is the answer. Some models
/// reply with just the marker and the translated text, so the whole
/// segment is used as a fallback.
fn extract_translation(segment: &str) -> String {
    if let Some(position) = segment.find("Translation>") {
        return segment[position + "Translation>".len()..].trim().to_string();
    }
    segment.trim().to_string()
}

fn extract_tag(regex: &Regex, raw: &str) -> String {
    regex
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}
