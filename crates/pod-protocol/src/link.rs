//! RFC 8288 `Link` header parsing.

use pod_types::resolve_uri;

use crate::http::{headers, HttpResponse};

/// One `<target>; param=value` entry of a `Link` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub target: String,
    pub params: Vec<(String, String)>,
}

impl Link {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The relation types of this link. `rel` may hold several
    /// space-separated values.
    pub fn rels(&self) -> impl Iterator<Item = &str> {
        self.param("rel").unwrap_or_default().split_whitespace()
    }

    pub fn has_rel(&self, rel: &str) -> bool {
        self.rels().any(|r| r == rel)
    }
}

/// Split on `sep` outside of `<...>` and quoted strings.
fn split_outside(value: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_angle = false;
    let mut in_quote = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quote => escaped = true,
            '"' if !in_angle => in_quote = !in_quote,
            '<' if !in_quote => in_angle = true,
            '>' if !in_quote => in_angle = false,
            c if c == sep && !in_angle && !in_quote => {
                parts.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}

/// Parse one `Link` header value. Malformed entries are skipped.
pub fn parse_link_header(value: &str) -> Vec<Link> {
    let mut links = Vec::new();
    for entry in split_outside(value, ',') {
        let mut pieces = split_outside(entry, ';').into_iter();
        let Some(target) = pieces.next().map(str::trim) else {
            continue;
        };
        let Some(target) = target.strip_prefix('<').and_then(|t| t.strip_suffix('>')) else {
            continue;
        };
        let params = pieces
            .filter_map(|p| {
                let (k, v) = p.split_once('=')?;
                Some((k.trim().to_ascii_lowercase(), unquote(v)))
            })
            .collect();
        links.push(Link { target: target.to_string(), params });
    }
    links
}

/// Every link across all `Link` headers of a response.
pub fn response_links(response: &HttpResponse) -> Vec<Link> {
    response
        .header_values(headers::LINK)
        .flat_map(parse_link_header)
        .collect()
}

/// Targets of every link with relation `rel`, resolved against `base`.
/// Targets that cannot be resolved are returned verbatim.
pub fn links_with_rel(response: &HttpResponse, rel: &str, base: &str) -> Vec<String> {
    response_links(response)
        .into_iter()
        .filter(|l| l.has_rel(rel))
        .map(|l| resolve_uri(base, &l.target).unwrap_or(l.target))
        .collect()
}

/// Format a single link entry.
pub fn format_link(target: &str, rel: &str) -> String {
    format!("<{target}>; rel=\"{rel}\"")
}
