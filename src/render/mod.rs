//! Rendering module for converting documents to Markdown.

mod frontmatter;
mod inline;
mod macros;
mod markdown;
mod options;
mod result;
mod table;

pub use frontmatter::{front_matter, page_properties};
pub use inline::{escape_markdown, heading_slug};
pub use macros::clean_user_name;
pub use markdown::{to_markdown, MarkdownRenderer};
pub use options::{RenderOptions, DEFAULT_IGNORED_MACROS};
pub use result::{RenderStats, RenderedDocument};
