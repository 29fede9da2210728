//! Document model types for Confluence content.
//!
//! This module defines the intermediate representation shared by the
//! retrieval side (REST client, HTML parser, in-memory source) and the
//! Markdown renderer. Every value here is plain data; nothing is mutated
//! once a document has been fetched.

mod attachment;
mod document;
pub(crate) mod node;
mod table;

pub use attachment::{Attachment, AttachmentVersion};
pub use document::{Document, Space};
pub use node::{
    plain_text, AlertKind, AttachmentRef, ContentNode, DocumentRef, Image, Link, LinkTarget, List,
    Macro, TextRun, TextStyle,
};
pub use table::{Table, TableCell, TableRow};
