//! Filename sanitization for generated path segments.

use std::collections::BTreeMap;
use unicode_normalization::UnicodeNormalization;

/// Default maximum segment length, in characters.
pub const DEFAULT_MAX_LENGTH: usize = 255;

/// Longest suffix treated as an extension when truncating.
const MAX_EXTENSION_LEN: usize = 16;

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Makes arbitrary titles safe to use as file or directory names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameSanitizer {
    map: BTreeMap<char, String>,
    max_length: usize,
}

impl Default for FilenameSanitizer {
    fn default() -> Self {
        Self {
            map: default_char_map(),
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

/// The default substitution map: characters illegal on common filesystems become `_`.
pub fn default_char_map() -> BTreeMap<char, String> {
    ['<', '>', ':', '"', '/', '\\', '|', '?', '*', '\0']
        .into_iter()
        .map(|c| (c, "_".to_string()))
        .collect()
}

impl FilenameSanitizer {
    /// Create a sanitizer with a custom substitution map.
    ///
    /// `/` is always substituted, even when the map omits it, since a title
    /// must never introduce a directory level.
    pub fn new(mut map: BTreeMap<char, String>, max_length: usize) -> Self {
        map.entry('/').or_insert_with(|| "_".to_string());
        map.entry('\0').or_insert_with(|| "_".to_string());
        Self {
            map,
            max_length: max_length.max(1),
        }
    }

    /// Build from string-keyed settings; each key contributes its first character.
    pub fn from_settings(map: &BTreeMap<String, String>, max_length: usize) -> Self {
        let map = map
            .iter()
            .filter_map(|(k, v)| k.chars().next().map(|c| (c, v.clone())))
            .collect();
        Self::new(map, max_length)
    }

    /// Maximum segment length.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Characters that never survive sanitization.
    pub fn forbidden_chars(&self) -> impl Iterator<Item = char> + '_ {
        self.map.keys().copied()
    }

    /// Sanitize one name. Does not truncate; see [`truncate`](Self::truncate).
    pub fn sanitize(&self, name: &str) -> String {
        let normalized: String = name.nfc().collect();

        let mut out = String::with_capacity(normalized.len());
        for c in normalized.chars() {
            match self.map.get(&c) {
                Some(replacement) => out.push_str(replacement),
                None if c.is_control() => out.push('_'),
                None => out.push(c),
            }
        }

        let mut out = out.trim_end_matches([' ', '.']).to_string();

        let stem = match out.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => out.as_str(),
        };
        if RESERVED_NAMES.contains(&stem.to_ascii_uppercase().as_str()) {
            out.push('_');
        }

        if out.is_empty() {
            out.push('_');
        }
        out
    }

    /// Truncate a segment to the maximum length, keeping a short extension.
    pub fn truncate(&self, segment: &str) -> String {
        let len = segment.chars().count();
        if len <= self.max_length {
            return segment.to_string();
        }

        if let Some((stem, ext)) = segment.rsplit_once('.') {
            let ext_len = ext.chars().count() + 1;
            if !stem.is_empty() && ext_len <= MAX_EXTENSION_LEN && ext_len < self.max_length {
                let keep: String = stem.chars().take(self.max_length - ext_len).collect();
                let keep = keep.trim_end_matches([' ', '.']);
                if !keep.is_empty() {
                    return format!("{}.{}", keep, ext);
                }
            }
        }

        let cut: String = segment.chars().take(self.max_length).collect();
        let trimmed = cut.trim_end_matches([' ', '.']);
        if trimmed.is_empty() {
            cut
        } else {
            trimmed.to_string()
        }
    }

    /// Whether a segment contains no forbidden character and fits the length limit.
    pub fn is_safe(&self, segment: &str) -> bool {
        segment.chars().count() <= self.max_length
            && !segment.chars().any(|c| self.map.contains_key(&c))
    }
}

/// Normalise a property name into a YAML-friendly key.
///
/// Lowercases, turns every other character into `_`, collapses runs and
/// prefixes `key_` when the result does not start with a letter.
pub fn sanitize_key(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let out = out.trim_matches('_');
    if out.starts_with(|c: char| c.is_ascii_lowercase()) {
        out.to_string()
    } else {
        format!("key_{}", out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_default_map() {
        let s = FilenameSanitizer::default();
        assert_eq!(s.sanitize("a/b\\c:d"), "a_b_c_d");
        assert_eq!(s.sanitize("What?"), "What_");
    }

    #[test]
    fn test_sanitize_trailing_dots_and_spaces() {
        let s = FilenameSanitizer::default();
        assert_eq!(s.sanitize("Notes. . "), "Notes");
        assert_eq!(s.sanitize("..."), "_");
        assert_eq!(s.sanitize(""), "_");
    }

    #[test]
    fn test_sanitize_reserved_names() {
        let s = FilenameSanitizer::default();
        assert_eq!(s.sanitize("con"), "con_");
        assert_eq!(s.sanitize("LPT1.txt"), "LPT1.txt_");
        assert_eq!(s.sanitize("Console"), "Console");
    }

    #[test]
    fn test_sanitize_nfc() {
        let s = FilenameSanitizer::default();
        let decomposed = "Cafe\u{301}";
        assert_eq!(s.sanitize(decomposed), "Caf\u{e9}");
    }

    #[test]
    fn test_custom_map_keeps_slash() {
        let mut map = BTreeMap::new();
        map.insert(' ', "-".to_string());
        let s = FilenameSanitizer::new(map, 255);
        assert_eq!(s.sanitize("a b/c"), "a-b_c");
    }

    #[test]
    fn test_truncate_keeps_extension() {
        let s = FilenameSanitizer::new(default_char_map(), 10);
        assert_eq!(s.truncate("abcdefghijkl.md"), "abcdefg.md");
        assert_eq!(s.truncate("abcdefghijklmnop"), "abcdefghij");
        assert_eq!(s.truncate("short.md"), "short.md");
    }

    #[test]
    fn test_is_safe() {
        let s = FilenameSanitizer::default();
        assert!(s.is_safe("Home.md"));
        assert!(!s.is_safe("a:b"));
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("Owner Name"), "owner_name");
        assert_eq!(sanitize_key("  Due--Date!! "), "due_date");
        assert_eq!(sanitize_key("2nd review"), "key_2nd_review");
    }
}
