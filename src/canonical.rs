//! XML normalization into a canonical, comparison-stable form
//!
//! Exported documents differ between runs only in volatile fields (the
//! export timestamp) and incidental formatting. Normalization parses the
//! document, drops the timestamp, and re-serializes with fixed
//! indentation so that two documents are equal iff their canonical forms
//! are byte-identical.

use xmltree::{Element, EmitterConfig, XMLNode};

use crate::error::{Result, SyncError};

const INDENT: &str = "    ";

/// Parse a raw document into an element tree.
///
/// # Errors
///
/// Returns [`SyncError::MalformedDocument`] if the input is not
/// well-formed XML.
pub fn parse(raw: &str) -> Result<Element> {
    Element::parse(raw.as_bytes()).map_err(|e| SyncError::MalformedDocument(e.to_string()))
}

/// Parse a raw document and remove the top-level export timestamp.
///
/// The `<date>` element changes on every export and must not cause
/// spurious differences.
///
/// # Errors
///
/// Returns [`SyncError::MalformedDocument`] if the input is not
/// well-formed XML.
pub fn parse_stripped(raw: &str) -> Result<Element> {
    let mut root = parse(raw)?;
    root.take_child("date");
    Ok(root)
}

/// Extract the template's technical name from a parsed document.
///
/// Descends the fixed `templates` → `template` → `template` path.
///
/// # Errors
///
/// Returns [`SyncError::NameNotFound`] if the path is absent, which
/// indicates malformed or foreign input.
pub fn extract_name(root: &Element) -> Result<String> {
    root.get_child("templates")
        .and_then(|templates| templates.get_child("template"))
        .and_then(|entry| entry.get_child("template"))
        .and_then(|name| name.get_text())
        .map(|text| text.trim().to_string())
        .ok_or(SyncError::NameNotFound)
}

/// Normalize a raw document into its canonical text form.
///
/// # Errors
///
/// Returns [`SyncError::MalformedDocument`] if the input cannot be
/// parsed or re-serialized.
pub fn normalize(raw: &str) -> Result<String> {
    render(parse_stripped(raw)?)
}

/// Serialize an element tree into canonical text.
///
/// Whitespace-only text nodes are pruned, the tree is emitted with
/// four-space indentation and no XML declaration, and blank lines are
/// dropped. The result uses `\n` separators with no trailing newline.
///
/// # Errors
///
/// Returns [`SyncError::MalformedDocument`] if serialization fails.
pub fn render(mut root: Element) -> Result<String> {
    prune_whitespace(&mut root);

    let emitter = EmitterConfig::new()
        .perform_indent(true)
        .indent_string(INDENT)
        .write_document_declaration(false);

    let mut buf = Vec::new();
    root.write_with_config(&mut buf, emitter)
        .map_err(|e| SyncError::MalformedDocument(e.to_string()))?;
    let text = String::from_utf8_lossy(&buf);

    Ok(text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

// Indentation from the source document survives the parse as text nodes;
// left in place it would fight the emitter's own indentation.
fn prune_whitespace(element: &mut Element) {
    element
        .children
        .retain(|child| !matches!(child, XMLNode::Text(text) if text.trim().is_empty()));
    for child in &mut element.children {
        if let XMLNode::Element(e) = child {
            prune_whitespace(e);
        }
    }
}
