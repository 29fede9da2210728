//! Link targets between exported files.

use serde::{Deserialize, Serialize};

/// How links between exported files are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStyle {
    /// Relative to the linking file's directory
    #[default]
    Relative,
    /// Rooted at the export directory (`/space/page.md`)
    Absolute,
}

/// Compute the href from one exported file to another.
///
/// Both paths are `/`-separated and relative to the export root.
/// Characters that would end a Markdown link target are percent-encoded.
pub fn link_href(style: LinkStyle, from_file: &str, to_file: &str) -> String {
    let raw = match style {
        LinkStyle::Relative => relative_path(from_file, to_file),
        LinkStyle::Absolute => format!("/{}", to_file.trim_start_matches('/')),
    };
    encode_link_path(&raw)
}

/// Relative path from the directory of `from_file` to `to_file`.
pub fn relative_path(from_file: &str, to_file: &str) -> String {
    let from: Vec<&str> = segments(from_file).collect();
    let to: Vec<&str> = segments(to_file).collect();
    let from_dir = &from[..from.len().saturating_sub(1)];

    let common = from_dir
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::with_capacity(from_dir.len() - common + to.len() - common);
    parts.extend(std::iter::repeat("..").take(from_dir.len() - common));
    parts.extend(&to[common..]);

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Resolve an href written in `from_file` back to a root-relative path.
///
/// Inverse of [`relative_path`]; absolute hrefs are taken from the root.
pub fn resolve_href(from_file: &str, href: &str) -> String {
    let href = decode_link_path(href);
    let mut stack: Vec<&str> = if href.starts_with('/') {
        Vec::new()
    } else {
        let mut dir: Vec<&str> = segments(from_file).collect();
        dir.pop();
        dir
    };

    for part in segments(&href) {
        match part {
            "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    stack.join("/")
}

/// Characters percent-encoded in link targets; `%` comes first so decoding is exact.
const ENCODED: [(char, &str); 6] = [
    ('%', "%25"),
    (' ', "%20"),
    ('(', "%28"),
    (')', "%29"),
    ('<', "%3C"),
    ('>', "%3E"),
];

/// Percent-encode the characters that would end or unbalance a Markdown link target.
pub fn encode_link_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match ENCODED.iter().find(|(raw, _)| *raw == c) {
            Some((_, code)) => out.push_str(code),
            None => out.push(c),
        }
    }
    out
}

/// Undo [`encode_link_path`]. Unknown escapes are left as they are.
pub fn decode_link_path(href: &str) -> String {
    let mut out = String::with_capacity(href.len());
    let mut rest = href;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escape = rest.get(pos..pos + 3);
        match ENCODED
            .iter()
            .find(|(_, code)| escape.is_some_and(|e| e.eq_ignore_ascii_case(code)))
        {
            Some((raw, _)) => {
                out.push(*raw);
                rest = &rest[pos + 3..];
            }
            None => {
                out.push('%');
                rest = &rest[pos + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
