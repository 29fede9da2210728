//! Document-level types.

use super::{Attachment, ContentNode};
use serde::{Deserialize, Serialize};

/// A Confluence page, fetched once per export run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Page ID
    pub id: String,

    /// Page title
    pub title: String,

    /// Key of the space the page lives in
    pub space_key: String,

    /// Ancestor page IDs, root first, parent last
    pub ancestors: Vec<String>,

    /// Content tree
    pub body: Vec<ContentNode>,

    /// Labels
    pub labels: Vec<String>,

    /// Page properties in document order
    pub properties: Vec<(String, String)>,

    /// Attachments owned by the page
    pub attachments: Vec<Attachment>,

    /// Link to the page in the Confluence UI
    pub web_url: Option<String>,
}

impl Document {
    /// Create a new empty document.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        space_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            space_key: space_key.into(),
            ..Default::default()
        }
    }

    /// Set the ancestor chain (root first).
    pub fn with_ancestors<S: Into<String>>(mut self, ancestors: impl IntoIterator<Item = S>) -> Self {
        self.ancestors = ancestors.into_iter().map(Into::into).collect();
        self
    }

    /// Set the content tree.
    pub fn with_body(mut self, body: Vec<ContentNode>) -> Self {
        self.body = body;
        self
    }

    /// Add a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Add a page property. A repeated key replaces the earlier value in place.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    /// Add an attachment.
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Set the web URL.
    pub fn with_web_url(mut self, url: impl Into<String>) -> Self {
        self.web_url = Some(url.into());
        self
    }

    /// Insert or replace a page property, keeping insertion order.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.properties.push((key, value)),
        }
    }

    /// Get a page property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// ID of the direct parent, if any.
    pub fn parent_id(&self) -> Option<&str> {
        self.ancestors.last().map(String::as_str)
    }

    /// Nesting depth (0 for top-level pages).
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// Get plain text content of the entire document.
    pub fn plain_text(&self) -> String {
        self.body
            .iter()
            .map(ContentNode::plain_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A Confluence space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    /// Space key
    pub key: String,

    /// Display name
    pub name: String,

    /// Plain-text description
    pub description: String,

    /// Homepage ID; personal or archived spaces may have none
    pub homepage_id: Option<String>,

    /// Known member page IDs; may be empty when only the homepage is exposed
    pub members: Vec<String>,
}

impl Space {
    /// Create a new space.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the homepage.
    pub fn with_homepage(mut self, id: impl Into<String>) -> Self {
        self.homepage_id = Some(id.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a member page.
    pub fn with_member(mut self, id: impl Into<String>) -> Self {
        self.members.push(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_builder() {
        let doc = Document::new("3", "Leaf", "DOCS")
            .with_ancestors(["1", "2"])
            .with_label("howto")
            .with_property("Owner", "alice")
            .with_property("Owner", "bob");

        assert_eq!(doc.parent_id(), Some("2"));
        assert_eq!(doc.depth(), 2);
        assert_eq!(doc.property("Owner"), Some("bob"));
        assert_eq!(doc.properties.len(), 1);
    }

    #[test]
    fn test_document_plain_text() {
        let doc = Document::new("1", "Home", "DOCS").with_body(vec![
            ContentNode::heading(1, "Title"),
            ContentNode::paragraph("Body"),
        ]);
        assert_eq!(doc.plain_text(), "Title\n\nBody");
    }

    #[test]
    fn test_space_builder() {
        let space = Space::new("DOCS", "Documentation")
            .with_homepage("1")
            .with_member("2");
        assert_eq!(space.homepage_id.as_deref(), Some("1"));
        assert_eq!(space.members, vec!["2"]);
    }
}
