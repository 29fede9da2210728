//! Wire types of the Confluence REST API (v1) and their conversion to the model.

use crate::model::{Attachment, Document, Space};
use crate::parser::parse_page_html;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One page of a paginated listing.
#[derive(Debug, Deserialize)]
pub(super) struct Paged<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,

    #[serde(rename = "_links", default)]
    pub links: Links,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct Links {
    #[serde(default)]
    pub webui: Option<String>,

    #[serde(default)]
    pub download: Option<String>,

    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct IdOnly {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ContentJson {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    space: Option<SpaceRef>,

    #[serde(default)]
    body: Option<BodyJson>,

    #[serde(default)]
    metadata: Option<MetadataJson>,

    #[serde(default)]
    ancestors: Vec<IdOnly>,

    #[serde(rename = "_links", default)]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct SpaceRef {
    key: String,
}

#[derive(Debug, Deserialize)]
struct BodyJson {
    #[serde(default)]
    view: Option<ValueJson>,

    #[serde(default)]
    export_view: Option<ValueJson>,
}

#[derive(Debug, Deserialize)]
struct ValueJson {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct MetadataJson {
    #[serde(default)]
    labels: Option<Paged<LabelJson>>,
}

#[derive(Debug, Deserialize)]
struct LabelJson {
    name: String,
}

impl ContentJson {
    /// Build a document, parsing the view body. `base_url` makes the web link absolute.
    pub(super) fn into_document(self, base_url: &str) -> Document {
        let (view, export_view) = match self.body {
            Some(body) => (body.view.map(|v| v.value), body.export_view.map(|v| v.value)),
            None => (None, None),
        };
        let parsed = parse_page_html(view.as_deref().unwrap_or_default(), export_view.as_deref());

        let mut doc = Document::new(
            self.id,
            self.title,
            self.space.map(|s| s.key).unwrap_or_default(),
        )
        .with_ancestors(self.ancestors.into_iter().map(|a| a.id))
        .with_body(parsed.nodes);

        for label in self.metadata.and_then(|m| m.labels).map(|l| l.results).unwrap_or_default() {
            doc = doc.with_label(label.name);
        }
        for (key, value) in parsed.properties {
            doc.set_property(key, value);
        }
        if let Some(webui) = self.links.webui {
            doc = doc.with_web_url(format!("{}{}", base_url, webui));
        }
        doc
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AttachmentJson {
    id: String,

    #[serde(default)]
    title: String,

    #[serde(default)]
    extensions: ExtensionsJson,

    #[serde(default)]
    version: Option<VersionJson>,

    #[serde(default)]
    container: Option<IdOnly>,

    #[serde(rename = "_links", default)]
    links: Links,

    #[serde(rename = "_expandable", default)]
    expandable: ExpandableJson,
}

/// References to unexpanded fields, e.g. `"space": "/rest/api/space/DOC"`.
#[derive(Debug, Default, Deserialize)]
struct ExpandableJson {
    #[serde(default)]
    space: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ExtensionsJson {
    media_type: String,
    file_size: u64,
    file_id: Option<String>,
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionJson {
    #[serde(default)]
    when: Option<DateTime<Utc>>,

    #[serde(default)]
    by: Option<UserJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserJson {
    #[serde(default)]
    display_name: Option<String>,
}

impl AttachmentJson {
    pub(super) fn into_attachment(self, owner_id: &str) -> Attachment {
        let space_key = self
            .expandable
            .space
            .as_deref()
            .and_then(|s| s.rsplit('/').next())
            .unwrap_or_default()
            .to_string();
        let owner = self
            .container
            .map(|c| c.id)
            .unwrap_or_else(|| owner_id.to_string());
        let mut attachment = Attachment::new(self.id, self.title, owner)
            .with_media_type(self.extensions.media_type)
            .with_space(space_key);
        attachment.file_size = self.extensions.file_size;
        if let Some(file_id) = self.extensions.file_id.filter(|f| !f.is_empty()) {
            attachment = attachment.with_file_id(file_id);
        }
        if let Some(comment) = self.extensions.comment {
            attachment = attachment.with_comment(comment);
        }
        if let Some(link) = self.links.download {
            attachment = attachment.with_download_link(link);
        }
        if let Some(VersionJson { when: Some(when), by }) = self.version {
            attachment = attachment.with_modified(when, by.and_then(|u| u.display_name));
        }
        attachment
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SpaceJson {
    key: String,

    #[serde(default)]
    name: String,

    #[serde(default)]
    description: Option<DescriptionJson>,

    #[serde(default)]
    homepage: Option<IdOnly>,
}

#[derive(Debug, Deserialize)]
struct DescriptionJson {
    #[serde(default)]
    plain: Option<ValueJson>,
}

impl SpaceJson {
    pub(super) fn has_homepage(&self) -> bool {
        self.homepage.is_some()
    }

    pub(super) fn key(&self) -> &str {
        &self.key
    }
}

impl From<SpaceJson> for Space {
    fn from(json: SpaceJson) -> Self {
        let mut space = Space::new(json.key, json.name);
        if let Some(description) = json.description.and_then(|d| d.plain) {
            space = space.with_description(description.value);
        }
        if let Some(home) = json.homepage {
            space = space.with_homepage(home.id);
        }
        space
    }
}
