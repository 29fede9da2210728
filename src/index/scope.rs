//! Export scopes.

use std::fmt;

/// The set of pages one export run targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportScope {
    /// A single page
    Page(String),

    /// A page and all its descendants, minus ignored subtrees
    Tree {
        /// Root page ID
        root: String,
        /// Page IDs excluded together with their descendants
        ignore: Vec<String>,
    },

    /// Every page of a space
    Space(String),

    /// Every page of every visible space
    AllSpaces,
}

impl ExportScope {
    /// A single page.
    pub fn page(id: impl Into<String>) -> Self {
        ExportScope::Page(id.into())
    }

    /// A page with descendants.
    pub fn tree(root: impl Into<String>) -> Self {
        ExportScope::Tree {
            root: root.into(),
            ignore: Vec::new(),
        }
    }

    /// A space.
    pub fn space(key: impl Into<String>) -> Self {
        ExportScope::Space(key.into())
    }

    /// Exclude pages (and their subtrees) from a tree scope. No effect on other scopes.
    pub fn ignoring<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        if let ExportScope::Tree { ignore, .. } = &mut self {
            ignore.extend(ids.into_iter().map(Into::into));
        }
        self
    }

    /// Whether the scope follows child pages.
    pub fn includes_descendants(&self) -> bool {
        !matches!(self, ExportScope::Page(_))
    }

    /// Whether a page is excluded by the ignore list.
    pub fn is_ignored(&self, id: &str) -> bool {
        match self {
            ExportScope::Tree { ignore, .. } => ignore.iter().any(|i| i == id),
            _ => false,
        }
    }
}

impl fmt::Display for ExportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportScope::Page(id) => write!(f, "page {}", id),
            ExportScope::Tree { root, ignore } if ignore.is_empty() => {
                write!(f, "page {} with descendants", root)
            }
            ExportScope::Tree { root, ignore } => write!(
                f,
                "page {} with descendants (ignoring {})",
                root,
                ignore.join(", ")
            ),
            ExportScope::Space(key) => write!(f, "space {}", key),
            ExportScope::AllSpaces => f.write_str("all spaces"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignoring_only_applies_to_tree() {
        let tree = ExportScope::tree("1").ignoring(["5"]);
        assert!(tree.is_ignored("5"));
        assert!(!tree.is_ignored("1"));

        let page = ExportScope::page("1").ignoring(["5"]);
        assert!(!page.is_ignored("5"));
        assert!(!page.includes_descendants());
    }

    #[test]
    fn test_display() {
        assert_eq!(ExportScope::space("DOCS").to_string(), "space DOCS");
        assert_eq!(
            ExportScope::tree("1").ignoring(["2", "3"]).to_string(),
            "page 1 with descendants (ignoring 2, 3)"
        );
    }
}
