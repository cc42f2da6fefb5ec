//! Surface implementation for contenteditable regions.

use crate::dom::RichArea;
use crate::engine::cursor;
use crate::engine::surface::{EditSurface, SurfaceKind};

impl EditSurface for RichArea {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Rich
    }

    /// Correct only when the caret anchor is a single text node. A caret
    /// at a node boundary (right after an inline image, say) aborts so no
    /// expansion is attempted and default Tab behavior proceeds.
    fn text_before_cursor(&self) -> Option<String> {
        let caret = self.caret()?;
        let text = self.text(caret.node)?;
        Some(text.chars().take(caret.offset).collect())
    }

    fn replace(&mut self, typed_trigger: &str, plain: &str, html: Option<&str>) -> bool {
        let trigger_len = typed_trigger.chars().count();
        let Some(caret) = self.caret() else {
            return false;
        };
        if self.text(caret.node).is_none() {
            return false;
        }
        // The trigger span must lie inside this one text node.
        if caret.offset < trigger_len {
            return false;
        }
        let start = caret.offset - trigger_len;
        self.set_selection_in_text(caret.node, start, caret.offset);

        match html {
            Some(html_content) => {
                if !self.exec_insert_html(html_content) {
                    return false;
                }
                cursor::resolve_rich_marker(self);
            }
            None => {
                if !self.exec_insert_text(plain) {
                    return false;
                }
                cursor::resolve_rich_sentinel(self);
            }
        }
        true
    }
}
