//! The two-operation contract every editing surface implements.

use crate::dom::PageElement;

/// Which structural kind of editing surface a target element is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Single-line inputs and textareas.
    Plain,
    /// contenteditable regions.
    Rich,
}

/// Uniform view over the editing-surface variants.
///
/// Both operations are silent on failure: an extraction that cannot be
/// performed returns `None`, and a replacement that cannot be performed
/// returns `false` and leaves the surface untouched. Callers treat either
/// as "do not expand" rather than as an error.
pub trait EditSurface {
    fn kind(&self) -> SurfaceKind;

    /// Text between the start of the caret's editing context and the
    /// caret itself.
    fn text_before_cursor(&self) -> Option<String>;

    /// Replace the typed trigger ending at the caret with resolved
    /// content, then resolve the cursor-marker protocol.
    fn replace(&mut self, typed_trigger: &str, plain: &str, html: Option<&str>) -> bool;
}

/// Classify a focused element, returning a surface for the kinds we
/// handle. Unhandled elements get `None` and keep their default Tab
/// behavior.
pub fn surface_for(element: &mut PageElement) -> Option<&mut dyn EditSurface> {
    match element {
        PageElement::TextInput(field) | PageElement::TextArea(field) => Some(field),
        PageElement::Editable(area) => Some(area),
        PageElement::Other(_) => None,
    }
}
