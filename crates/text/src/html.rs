// ABOUTME: Visible-text extraction from statement HTML fragments.
// ABOUTME: Drops non-rendering containers and comments, joins trimmed text nodes with single spaces.

use ego_tree::NodeRef;
use scraper::{Html, Node};

/// Elements whose text never reaches the rendered page.
const HIDDEN_CONTAINERS: &[&str] = &[
    "style", "script", "head", "title", "meta", "noscript", "template",
];

/// Extracts the human-visible text of an HTML fragment.
///
/// Text nodes are visited in document order, trimmed, and joined with a single
/// space; empty nodes are dropped. Entities are decoded by the parser.
/// html5ever recovers from any input, so malformed markup degrades to its
/// best-effort tree and tag-free input comes back as plain text.
pub fn text_from_html(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut parts: Vec<&str> = Vec::new();
    for node in document.tree.root().descendants() {
        if let Node::Text(text) = node.value() {
            if !is_visible(&node) {
                continue;
            }
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
    }

    parts.join(" ")
}

/// A text node is visible unless some ancestor is a non-rendering container.
fn is_visible(node: &NodeRef<'_, Node>) -> bool {
    !node
        .ancestors()
        .filter_map(|ancestor| ancestor.value().as_element())
        .any(|element| HIDDEN_CONTAINERS.contains(&element.name()))
}
