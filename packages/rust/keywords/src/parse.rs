//! Best-effort parsing of the model's keyword reply.
//!
//! The prompt asks for `["a", "b", "c"]`, but replies drift: code fences,
//! single quotes, bare comma lists. Each pass is tried in order and the
//! first one that yields anything wins.

use std::sync::LazyLock;

use regex::Regex;

/// Parse a reply into tags. An empty or unparseable reply yields no tags.
pub fn parse_tags(reply: &str) -> Vec<String> {
    let reply = strip_code_fence(reply.trim());
    if reply.is_empty() {
        return Vec::new();
    }

    if let Some(tags) = parse_json_array(reply) {
        return tags;
    }

    let quoted = parse_quoted(reply);
    if !quoted.is_empty() {
        return quoted;
    }

    parse_separated(reply)
}

fn strip_code_fence(reply: &str) -> &str {
    let Some(inner) = reply.strip_prefix("```") else {
        return reply;
    };
    // Drop an info string such as ```json
    let inner = inner.split_once('\n').map_or(inner, |(_, rest)| rest);
    inner.trim_end().trim_end_matches("```").trim()
}

fn parse_json_array(reply: &str) -> Option<Vec<String>> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end < start {
        return None;
    }

    serde_json::from_str::<Vec<String>>(&reply[start..=end])
        .ok()
        .map(|tags| {
            tags.into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
}

fn parse_quoted(reply: &str) -> Vec<String> {
    static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#""([^"]+)"|'([^']+)'"#).expect("valid regex")
    });

    QUOTED_RE
        .captures_iter(reply)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_separated(reply: &str) -> Vec<String> {
    reply
        .split([',', '\n'])
        .map(|part| {
            part.trim_matches(|c: char| {
                c.is_whitespace() || matches!(c, '[' | ']' | '-' | '*' | '.')
            })
            .to_string()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_list() {
        assert_eq!(
            parse_tags(r#"["ferie", "permisjon", "lønn"]"#),
            vec!["ferie", "permisjon", "lønn"]
        );
    }

    #[test]
    fn fenced_json_list() {
        let reply = "```json\n[\"rekruttering\", \"intervju\"]\n```";
        assert_eq!(parse_tags(reply), vec!["rekruttering", "intervju"]);
    }

    #[test]
    fn python_style_single_quotes() {
        assert_eq!(
            parse_tags("['ferie', 'fravær', 'sykdom']"),
            vec!["ferie", "fravær", "sykdom"]
        );
    }

    #[test]
    fn bare_comma_list() {
        assert_eq!(
            parse_tags("ferie, permisjon,  lønn."),
            vec!["ferie", "permisjon", "lønn"]
        );
    }

    #[test]
    fn bulleted_lines() {
        assert_eq!(parse_tags("- ferie\n- avspasering"), vec!["ferie", "avspasering"]);
    }

    #[test]
    fn empty_reply() {
        assert!(parse_tags("").is_empty());
        assert!(parse_tags("[]").is_empty());
        assert!(parse_tags("   ").is_empty());
    }
}
