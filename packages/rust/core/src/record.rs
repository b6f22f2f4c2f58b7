//! Per-file transforms: title cleanup, leader flag, URL line.
//!
//! Each transform is a pure `&str -> _` function so the batch pipeline can
//! apply them in sequence and tests can pin their behavior directly.

use drivedocs_shared::UNTITLED;

/// Substring in a raw title that marks a leaders-only document.
pub const LEADER_MARKER: &str = "KUN FOR LEDER";

/// Marker phrases removed from the title, longest first.
const LEADER_PHRASES: [&str; 4] = [
    "- KUN FOR LEDERE",
    "- KUN FOR LEDER",
    "KUN FOR LEDERE",
    "KUN FOR LEDER",
];

/// Extension suffixes stripped from titles.
const EXTENSIONS: [&str; 2] = [".docx", ".txt"];

/// Characters that cannot appear in a file name component.
const UNSAFE_CHARS: [char; 2] = ['?', '/'];

/// Label that may precede the URL on a document's first line.
const URL_LABEL: &str = "Dokument URL:";

/// Substring that identifies the first line as a URL line.
const URL_HINT: &str = "https";

const BOM: char = '\u{feff}';

// ---------------------------------------------------------------------------
// Titles
// ---------------------------------------------------------------------------

/// A cleaned title plus the leader flag derived from the raw title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleInfo {
    pub title: String,
    pub for_leaders: bool,
}

/// Derive the display title and leader flag from a raw title.
///
/// Leader phrases are removed first, then the result is sanitized.
pub fn title_info(raw: &str) -> TitleInfo {
    let for_leaders = is_for_leaders(raw);
    let working = if for_leaders {
        strip_leader_markers(raw)
    } else {
        raw.to_string()
    };

    TitleInfo {
        title: sanitize_title(&working),
        for_leaders,
    }
}

/// Whether a raw title carries the leaders-only marker (case-sensitive).
pub fn is_for_leaders(raw: &str) -> bool {
    raw.contains(LEADER_MARKER)
}

/// Remove every leader marker phrase from a title.
pub fn strip_leader_markers(raw: &str) -> String {
    LEADER_PHRASES
        .iter()
        .fold(raw.to_string(), |title, phrase| title.replace(phrase, ""))
}

/// Make a title safe for use as a file name.
///
/// Replaces `?` and `/` with `_`, strips `.docx`/`.txt` suffixes and
/// surrounding whitespace. Idempotent; never returns an empty string.
pub fn sanitize_title(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let mut title = replaced.trim();
    // Repeat so "a.txt.docx" and "a.docx " end up stable.
    while let Some(stripped) = EXTENSIONS.iter().find_map(|ext| title.strip_suffix(*ext)) {
        title = stripped.trim();
    }

    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title.to_string()
    }
}

// ---------------------------------------------------------------------------
// Body / URL
// ---------------------------------------------------------------------------

/// Document text split into the URL from its first line and the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBody {
    /// Cleaned URL, or empty when the first line holds none.
    pub url: String,
    /// Lines after the first, joined by single spaces.
    pub body: String,
}

/// Split off the first line of `text`, reading it as a URL line if it has one.
///
/// The first line never ends up in the body, URL or not.
pub fn extract_url(text: &str) -> ExtractedBody {
    let mut lines = text.split('\n');
    let first = lines.next().unwrap_or_default();

    let url = if first.contains(URL_HINT) {
        clean_url_line(first)
    } else {
        String::new()
    };

    ExtractedBody {
        url,
        body: lines.collect::<Vec<_>>().join(" "),
    }
}

fn clean_url_line(line: &str) -> String {
    let without_bom = line.replace(BOM, "");
    let trimmed = without_bom.trim();
    trimmed
        .strip_prefix(URL_LABEL)
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}
