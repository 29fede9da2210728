//! YAML front matter from page properties and labels.

use crate::error::{Error, Result};
use crate::model::{ContentNode, Document};
use crate::path::sanitize_key;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;

const INDENT: &str = "  ";

fn list_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^( *)(- )").expect("valid list item regex"))
}

/// Build a `---` delimited YAML block, or an empty string when there is nothing to say.
///
/// Property names are normalised into YAML-friendly keys; labels become a
/// `tags` list of `#label` entries. Root-level list items are indented.
pub fn front_matter(properties: &[(String, String)], labels: &[String]) -> Result<String> {
    let mut mapping = Mapping::new();
    for (key, value) in properties {
        if value.trim().is_empty() {
            continue;
        }
        mapping.insert(
            Value::String(sanitize_key(key)),
            Value::String(value.trim().to_string()),
        );
    }
    if !labels.is_empty() {
        let tags = labels
            .iter()
            .map(|l| Value::String(format!("#{}", l)))
            .collect();
        mapping.insert(Value::String("tags".to_string()), Value::Sequence(tags));
    }

    if mapping.is_empty() {
        return Ok(String::new());
    }

    let yaml = serde_yaml::to_string(&mapping).map_err(|e| Error::Render(e.to_string()))?;
    let yaml = list_item_regex().replace_all(yaml.trim(), format!("${{1}}{}${{2}}", INDENT));
    Ok(format!("---\n{}\n---", yaml))
}

/// Page properties of a document: its own, followed by any found in `details` macros.
pub fn page_properties(doc: &Document) -> Vec<(String, String)> {
    let mut properties = doc.properties.clone();
    collect_details(&doc.body, &mut properties);
    properties
}

fn collect_details(nodes: &[ContentNode], out: &mut Vec<(String, String)>) {
    for node in nodes {
        match node {
            ContentNode::Macro(m) if m.name == "details" => {
                for table in m.body.iter().filter_map(|n| match n {
                    ContentNode::Table(t) => Some(t),
                    _ => None,
                }) {
                    for row in &table.rows {
                        if let [key, value] = row.cells.as_slice() {
                            let key = key.plain_text().trim().to_string();
                            if !key.is_empty() && !out.iter().any(|(k, _)| *k == key) {
                                out.push((key, value.plain_text().trim().to_string()));
                            }
                        }
                    }
                }
            }
            other => collect_details(other.children(), out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Macro, Table, TableRow};

    #[test]
    fn test_front_matter_properties_and_tags() {
        let props = vec![
            ("Owner Name".to_string(), "Alice".to_string()),
            ("Status".to_string(), "".to_string()),
        ];
        let labels = vec!["howto".to_string(), "draft".to_string()];
        let fm = front_matter(&props, &labels).unwrap();

        assert!(fm.starts_with("---\n"));
        assert!(fm.ends_with("\n---"));
        assert!(fm.contains("owner_name: Alice"));
        assert!(!fm.contains("status"));
        assert!(fm.contains("tags:\n  - '#howto'\n  - '#draft'"));
    }

    #[test]
    fn test_front_matter_empty() {
        assert_eq!(front_matter(&[], &[]).unwrap(), "");
    }

    #[test]
    fn test_page_properties_from_details_macro() {
        let details = Macro::new("details").with_body(vec![ContentNode::Table(Table::from_rows(
            vec![
                TableRow::from_strings(["Owner", "Bob"]),
                TableRow::from_strings(["Due", "Friday"]),
            ],
        ))]);
        let doc = Document::new("1", "Page", "DOCS")
            .with_property("Owner", "Alice")
            .with_body(vec![ContentNode::Macro(details)]);

        let props = page_properties(&doc);
        assert_eq!(
            props,
            vec![
                ("Owner".to_string(), "Alice".to_string()),
                ("Due".to_string(), "Friday".to_string()),
            ]
        );
    }
}
