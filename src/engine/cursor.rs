//! Cursor-marker protocol.
//!
//! A snippet author writes `{{cursor}}` anywhere in their content and the
//! caret lands exactly there post-expansion. During resolution the token
//! becomes a transient placeholder: a reserved sentinel character in plain
//! text, a uniquely-identified zero-width element in HTML. The placeholder
//! is consumed and removed immediately after insertion and must never
//! reach the page's permanent content.

use crate::dom::{RichArea, TextField};

/// Reserved sentinel character for plain-text content. Zero-width, so an
/// interrupted cleanup never leaves a visible artifact.
pub const SENTINEL: char = '\u{200B}';

/// Attribute identifying the rich-text marker element.
pub const MARKER_ATTR: &str = "data-snipflow-caret";

/// Build the zero-width marker element for HTML content.
pub fn marker_html(id: &str) -> String {
    format!("<span {}=\"{}\"></span>", MARKER_ATTR, id)
}

/// Plain path: locate the sentinel, select exactly that one character,
/// delete it, and leave the collapsed selection as the final caret.
pub(crate) fn resolve_plain(field: &mut TextField) {
    let Some(index) = field.value().chars().position(|c| c == SENTINEL) else {
        return;
    };
    field.set_selection(index, index + 1);
    if !field.exec_delete() {
        field.replace_range_direct(index, index + 1, "");
    }
}

/// Rich path: locate the marker element, collapse the selection to
/// immediately after it, and detach it from the tree.
pub(crate) fn resolve_rich_marker(area: &mut RichArea) {
    let Some(marker) = area.find_element_with_attr(MARKER_ATTR) else {
        return;
    };
    let Some(parent) = area.parent(marker) else {
        return;
    };
    let Some(index) = area.child_index(parent, marker) else {
        return;
    };
    area.detach(marker);
    area.set_caret(parent, index);
}

/// Plain-into-rich path: walk text nodes for the sentinel, trim it out of
/// the node's text, and collapse the caret to the vacated offset.
pub(crate) fn resolve_rich_sentinel(area: &mut RichArea) {
    for node in area.text_nodes() {
        let position = area
            .text(node)
            .and_then(|text| text.chars().position(|c| c == SENTINEL));
        if let Some(index) = position {
            area.replace_text_range(node, index, index + 1, "");
            area.set_caret(node, index);
            return;
        }
    }
}
