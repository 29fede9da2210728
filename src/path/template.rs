//! Path templates with `{placeholder}` substitution.

use super::FilenameSanitizer;
use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}]*)\}").expect("valid placeholder regex"))
}

/// What a template names: pages or attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Markdown output of a page
    Page,
    /// Downloaded attachment file
    Attachment,
}

/// A template placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    SpaceKey,
    SpaceName,
    HomepageId,
    HomepageTitle,
    AncestorIds,
    AncestorTitles,
    PageId,
    PageTitle,
    AttachmentId,
    AttachmentTitle,
    AttachmentFileId,
    AttachmentExtension,
}

impl Variable {
    const ALL: [Variable; 12] = [
        Variable::SpaceKey,
        Variable::SpaceName,
        Variable::HomepageId,
        Variable::HomepageTitle,
        Variable::AncestorIds,
        Variable::AncestorTitles,
        Variable::PageId,
        Variable::PageTitle,
        Variable::AttachmentId,
        Variable::AttachmentTitle,
        Variable::AttachmentFileId,
        Variable::AttachmentExtension,
    ];

    /// Placeholder name as written in templates.
    pub fn name(self) -> &'static str {
        match self {
            Variable::SpaceKey => "space_key",
            Variable::SpaceName => "space_name",
            Variable::HomepageId => "homepage_id",
            Variable::HomepageTitle => "homepage_title",
            Variable::AncestorIds => "ancestor_ids",
            Variable::AncestorTitles => "ancestor_titles",
            Variable::PageId => "page_id",
            Variable::PageTitle => "page_title",
            Variable::AttachmentId => "attachment_id",
            Variable::AttachmentTitle => "attachment_title",
            Variable::AttachmentFileId => "attachment_file_id",
            Variable::AttachmentExtension => "attachment_extension",
        }
    }

    /// Whether the placeholder is meaningful for the given template kind.
    pub fn allowed_in(self, kind: TemplateKind) -> bool {
        match self {
            Variable::PageId | Variable::PageTitle => kind == TemplateKind::Page,
            Variable::AttachmentId
            | Variable::AttachmentTitle
            | Variable::AttachmentFileId
            | Variable::AttachmentExtension => kind == TemplateKind::Attachment,
            _ => true,
        }
    }

    fn lookup(name: &str, kind: TemplateKind) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.name() == name && v.allowed_in(kind))
    }
}

/// Values bound to template placeholders.
///
/// Raw, unsanitized values; the template sanitizes each one while rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    pub space_key: String,
    pub space_name: String,
    pub homepage_id: String,
    pub homepage_title: String,
    /// Root first
    pub ancestor_ids: Vec<String>,
    /// Root first, same length as `ancestor_ids`
    pub ancestor_titles: Vec<String>,
    pub page_id: String,
    pub page_title: String,
    pub attachment_id: String,
    pub attachment_title: String,
    /// Absent on some Confluence versions; falls back to `attachment_id`
    pub attachment_file_id: Option<String>,
    /// Including the leading dot, or empty
    pub attachment_extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Var(Variable),
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    kind: TemplateKind,
    parts: Vec<Part>,
}

impl PathTemplate {
    /// Parse a template, rejecting placeholders that do not apply to `kind`.
    ///
    /// A `{` without a matching `}` is kept as literal text.
    pub fn parse(template: &str, kind: TemplateKind) -> Result<Self> {
        let mut parts = Vec::new();
        let mut last = 0;

        for caps in placeholder_regex().captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                parts.push(Part::Literal(template[last..whole.start()].to_string()));
            }
            let var = Variable::lookup(name.as_str().trim(), kind).ok_or_else(|| {
                Error::InvalidTemplate {
                    template: template.to_string(),
                    placeholder: name.as_str().to_string(),
                }
            })?;
            parts.push(Part::Var(var));
            last = whole.end();
        }
        if last < template.len() {
            parts.push(Part::Literal(template[last..].to_string()));
        }

        Ok(Self {
            source: template.to_string(),
            kind,
            parts,
        })
    }

    /// Parse a page template.
    pub fn page(template: &str) -> Result<Self> {
        Self::parse(template, TemplateKind::Page)
    }

    /// Parse an attachment template.
    pub fn attachment(template: &str) -> Result<Self> {
        Self::parse(template, TemplateKind::Attachment)
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Template kind.
    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Placeholders used, in order of appearance.
    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.parts.iter().filter_map(|p| match p {
            Part::Var(v) => Some(*v),
            Part::Literal(_) => None,
        })
    }

    /// Render a `/`-separated relative path.
    ///
    /// Every bound value is sanitized before substitution. Empty segments
    /// are dropped, so an empty ancestor list never doubles a separator, and
    /// `.`/`..` segments are dropped so the result stays below the output
    /// root. Each segment is then truncated to the sanitizer's limit.
    pub fn render(&self, vars: &TemplateVars, sanitizer: &FilenameSanitizer) -> String {
        let mut raw = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => raw.push_str(text),
                Part::Var(var) => raw.push_str(&substitute(*var, vars, sanitizer)),
            }
        }

        let segments: Vec<String> = raw
            .split(['/', '\\'])
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .map(|s| sanitizer.truncate(s))
            .collect();

        if segments.is_empty() {
            "_".to_string()
        } else {
            segments.join("/")
        }
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn substitute(var: Variable, vars: &TemplateVars, sanitizer: &FilenameSanitizer) -> String {
    let one = |value: &str| {
        if value.is_empty() {
            String::new()
        } else {
            sanitizer.sanitize(value)
        }
    };
    let many = |values: &[String]| {
        values
            .iter()
            .filter(|v| !v.is_empty())
            .map(|v| sanitizer.sanitize(v))
            .collect::<Vec<_>>()
            .join("/")
    };

    match var {
        Variable::SpaceKey => one(&vars.space_key),
        Variable::SpaceName => one(&vars.space_name),
        Variable::HomepageId => one(&vars.homepage_id),
        Variable::HomepageTitle => one(&vars.homepage_title),
        Variable::AncestorIds => many(&vars.ancestor_ids),
        Variable::AncestorTitles => many(&vars.ancestor_titles),
        Variable::PageId => one(&vars.page_id),
        Variable::PageTitle => one(&vars.page_title),
        Variable::AttachmentId => one(&vars.attachment_id),
        Variable::AttachmentTitle => one(&vars.attachment_title),
        Variable::AttachmentFileId => match vars.attachment_file_id.as_deref() {
            Some(file_id) if !file_id.trim().is_empty() => one(file_id),
            _ => one(&vars.attachment_id),
        },
        // Extensions are produced internally; only the map is applied so the dot survives.
        Variable::AttachmentExtension => vars
            .attachment_extension
            .chars()
            .filter(|c| !sanitizer.forbidden_chars().any(|f| f == *c))
            .collect(),
    }
}
