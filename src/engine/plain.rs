//! Surface implementation for plain inputs and textareas.

use crate::dom::TextField;
use crate::engine::cursor;
use crate::engine::surface::{EditSurface, SurfaceKind};

impl EditSurface for TextField {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Plain
    }

    fn text_before_cursor(&self) -> Option<String> {
        // A field that never received a real caret event has no tracked
        // selection; fall back to the full value.
        let end = self.selection_start().unwrap_or_else(|| self.char_len());
        Some(self.text_range(0, end))
    }

    fn replace(&mut self, typed_trigger: &str, plain: &str, _html: Option<&str>) -> bool {
        let trigger_len = typed_trigger.chars().count();
        let caret = self.selection_start().unwrap_or_else(|| self.char_len());
        if caret < trigger_len {
            return false;
        }
        let start = caret - trigger_len;
        self.set_selection(start, caret);
        if !self.exec_insert_text(plain) {
            // Compatibility fallback: mutate the value and dispatch a
            // synthetic input event.
            self.replace_range_direct(start, caret, plain);
        }
        cursor::resolve_plain(self);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::InputEvent;

    #[test]
    fn test_text_before_cursor_at_caret() {
        let mut field = TextField::with_value("hello //sig world");
        field.set_caret(11);
        assert_eq!(field.text_before_cursor(), Some("hello //sig".to_string()));
    }

    #[test]
    fn test_text_before_cursor_without_selection() {
        let field = TextField::with_value("//sig");
        assert_eq!(field.text_before_cursor(), Some("//sig".to_string()));
    }

    #[test]
    fn test_replace_uses_native_command() {
        let mut field = TextField::with_value("note: //sig");
        field.set_caret(11);
        assert!(field.replace("//sig", "Regards, Jane", None));
        assert_eq!(field.value(), "note: Regards, Jane");
        assert_eq!(field.events(), &[InputEvent::InsertText]);
        assert_eq!(field.selection(), Some((19, 19)));
    }

    #[test]
    fn test_replace_falls_back_to_direct_mutation() {
        let mut field = TextField::with_value("//sig").without_edit_commands();
        field.set_caret(5);
        assert!(field.replace("//sig", "Jane", None));
        assert_eq!(field.value(), "Jane");
        assert_eq!(field.events(), &[InputEvent::Synthetic]);
    }

    #[test]
    fn test_replace_with_cursor_sentinel() {
        let mut field = TextField::with_value("//sig");
        field.set_caret(5);
        assert!(field.replace("//sig", "Best, \u{200B}Jane", None));
        assert_eq!(field.value(), "Best, Jane");
        assert_eq!(field.selection(), Some((6, 6)));
    }

    #[test]
    fn test_replace_bails_when_trigger_longer_than_prefix() {
        let mut field = TextField::with_value("ab");
        field.set_caret(2);
        assert!(!field.replace("//sig", "x", None));
        assert_eq!(field.value(), "ab");
        assert!(field.events().is_empty());
    }
}
