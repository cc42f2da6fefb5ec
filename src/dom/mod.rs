//! In-memory model of the host page surfaces the engine drives.
//!
//! The engine never talks to a live DOM; it drives these types, which
//! reproduce the editing semantics it depends on: selections addressed in
//! characters, native edit commands that fire input events (with an
//! unsupported-command fallback), and a node tree with text-node carets
//! for rich regions.

pub mod html;

use html::HtmlNode;

/// A key identity, as reported by the host keyboard event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Tab,
    Char(char),
    Named(String),
}

/// A keydown event observed in the capture phase, before the host page
/// sees it.
#[derive(Debug)]
pub struct KeyEvent {
    key: Key,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn tab() -> Self {
        Self::new(Key::Tab)
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Input events dispatched on a surface, as the host page would observe
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Fired by the native insert-text edit command.
    InsertText,
    /// Fired by the native insert-HTML edit command.
    InsertHtml,
    /// Fired by the native delete edit command.
    DeleteContent,
    /// Manually dispatched after a direct value mutation.
    Synthetic,
}

/// A focusable element on the host page, as the capture-phase handler
/// sees it.
#[derive(Debug)]
pub enum PageElement {
    /// A single-line text input.
    TextInput(TextField),
    /// A multi-line textarea.
    TextArea(TextField),
    /// A contenteditable region.
    Editable(RichArea),
    /// Anything else (buttons, selects, canvas editors); never expanded.
    Other(String),
}

fn byte_at(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// A plain editable field: `<input type="text">` or `<textarea>`.
///
/// Selection offsets are character offsets into the value. A field that
/// never received a real caret has no tracked selection; extraction falls
/// back to the full value length.
#[derive(Debug)]
pub struct TextField {
    value: String,
    selection: Option<(usize, usize)>,
    commands_supported: bool,
    events: Vec<InputEvent>,
}

impl Default for TextField {
    fn default() -> Self {
        Self::new()
    }
}

impl TextField {
    pub fn new() -> Self {
        Self {
            value: String::new(),
            selection: None,
            commands_supported: true,
            events: Vec::new(),
        }
    }

    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            ..Self::new()
        }
    }

    /// Model a host where native edit commands are unsupported, forcing
    /// the direct-mutation compatibility path.
    pub fn without_edit_commands(mut self) -> Self {
        self.commands_supported = false;
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn char_len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn selection(&self) -> Option<(usize, usize)> {
        self.selection
    }

    pub fn selection_start(&self) -> Option<usize> {
        self.selection.map(|(start, _)| start)
    }

    pub fn set_caret(&mut self, offset: usize) {
        let offset = offset.min(self.char_len());
        self.selection = Some((offset, offset));
    }

    pub fn set_selection(&mut self, start: usize, end: usize) {
        let len = self.char_len();
        let start = start.min(len);
        let end = end.min(len).max(start);
        self.selection = Some((start, end));
    }

    /// Input events dispatched so far, oldest first.
    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    pub fn text_range(&self, start: usize, end: usize) -> String {
        self.value
            .chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect()
    }

    /// Native insert-text edit command: replaces the selection and fires a
    /// real input event. Returns false when the host does not support it.
    pub fn exec_insert_text(&mut self, text: &str) -> bool {
        if !self.commands_supported {
            return false;
        }
        let (start, end) = self
            .selection
            .unwrap_or((self.char_len(), self.char_len()));
        self.splice(start, end, text);
        let caret = start + text.chars().count();
        self.selection = Some((caret, caret));
        self.events.push(InputEvent::InsertText);
        true
    }

    /// Native delete edit command: removes the selection contents.
    pub fn exec_delete(&mut self) -> bool {
        if !self.commands_supported {
            return false;
        }
        let Some((start, end)) = self.selection else {
            return false;
        };
        if start == end {
            return false;
        }
        self.splice(start, end, "");
        self.selection = Some((start, start));
        self.events.push(InputEvent::DeleteContent);
        true
    }

    /// Direct value mutation plus a synthetic input event. Strictly worse
    /// compatibility mode than the native command; last resort only.
    pub fn replace_range_direct(&mut self, start: usize, end: usize, text: &str) {
        self.splice(start, end, text);
        let caret = start + text.chars().count();
        self.selection = Some((caret, caret));
        self.events.push(InputEvent::Synthetic);
    }

    fn splice(&mut self, start: usize, end: usize, text: &str) {
        let start_byte = byte_at(&self.value, start);
        let end_byte = byte_at(&self.value, end);
        self.value.replace_range(start_byte..end_byte, text);
    }
}

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Caret position: a character offset inside a text node, or a child
/// index inside an element node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub node: NodeId,
    pub offset: usize,
}

/// A contenteditable region: an arena node tree with a caret.
///
/// Selections are either collapsed or a character range inside a single
/// text node; that is the only range shape the expansion path ever
/// creates, and the only one the edit commands accept.
#[derive(Debug)]
pub struct RichArea {
    nodes: Vec<Node>,
    root: NodeId,
    selection: Option<(Caret, Caret)>,
    events: Vec<InputEvent>,
}

impl Default for RichArea {
    fn default() -> Self {
        Self::new()
    }
}

impl RichArea {
    pub fn new() -> Self {
        let root = Node {
            data: NodeData::Element {
                tag: "div".to_string(),
                attrs: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: 0,
            selection: None,
            events: Vec::new(),
        }
    }

    pub fn from_html(html_src: &str) -> Self {
        let mut area = Self::new();
        let fragment = html::parse_fragment(html_src);
        let root = area.root;
        area.attach_fragment(root, 0, &fragment);
        area
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id].data
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes[parent].children.iter().position(|&c| c == child)
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.nodes.push(Node {
            data: NodeData::Text(text.to_string()),
            parent: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    pub fn create_element(&mut self, tag: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.nodes.push(Node {
            data: NodeData::Element {
                tag: tag.to_string(),
                attrs,
            },
            parent: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let index = index.min(self.nodes[parent].children.len());
        self.nodes[parent].children.insert(index, child);
        self.nodes[child].parent = Some(parent);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let end = self.nodes[parent].children.len();
        self.insert_child(parent, end, child);
    }

    /// Detach a node from its parent, keeping any element-offset caret in
    /// the parent pointing at the same gap.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id].parent else {
            return;
        };
        let Some(index) = self.child_index(parent, id) else {
            return;
        };
        self.nodes[parent].children.remove(index);
        self.nodes[id].parent = None;
        if let Some((anchor, focus)) = self.selection.as_mut() {
            for caret in [anchor, focus] {
                if caret.node == parent && caret.offset > index {
                    caret.offset -= 1;
                }
            }
        }
    }

    /// Collapsed caret (the selection's start).
    pub fn caret(&self) -> Option<Caret> {
        self.selection.map(|(start, _)| start)
    }

    pub fn selection(&self) -> Option<(Caret, Caret)> {
        self.selection
    }

    pub fn set_caret(&mut self, node: NodeId, offset: usize) {
        let caret = Caret { node, offset };
        self.selection = Some((caret, caret));
    }

    /// Select a character range inside one text node.
    pub fn set_selection_in_text(&mut self, node: NodeId, start: usize, end: usize) {
        self.selection = Some((
            Caret {
                node,
                offset: start,
            },
            Caret { node, offset: end },
        ));
    }

    /// Input events dispatched so far, oldest first.
    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    /// Native plain-text insert: replaces the selection, which must sit
    /// inside a single text node.
    pub fn exec_insert_text(&mut self, text: &str) -> bool {
        let Some(((start, end), node)) = self.text_selection() else {
            return false;
        };
        self.splice_text(node, start, end, text);
        self.set_caret(node, start + text.chars().count());
        self.events.push(InputEvent::InsertText);
        true
    }

    /// Native HTML insert: replaces the selection (inside a single text
    /// node) with a parsed fragment; the caret lands after the last
    /// inserted node.
    pub fn exec_insert_html(&mut self, html_src: &str) -> bool {
        let Some(((start, end), node)) = self.text_selection() else {
            return false;
        };
        let Some(parent) = self.parent(node) else {
            return false;
        };
        let Some(index) = self.child_index(parent, node) else {
            return false;
        };
        let text = match self.text(node) {
            Some(t) => t.to_string(),
            None => return false,
        };
        let before: String = text.chars().take(start).collect();
        let after: String = text.chars().skip(end).collect();

        let mut at = index;
        if before.is_empty() {
            self.detach(node);
        } else {
            self.set_text(node, &before);
            at = index + 1;
        }
        let fragment = html::parse_fragment(html_src);
        let inserted = self.attach_fragment(parent, at, &fragment);
        if !after.is_empty() {
            let tail = self.create_text(&after);
            self.insert_child(parent, at + inserted, tail);
        }
        self.set_caret(parent, at + inserted);
        self.events.push(InputEvent::InsertHtml);
        true
    }

    /// Replace a character range in a text node directly (no edit command,
    /// no input event). Used by marker cleanup.
    pub fn replace_text_range(
        &mut self,
        id: NodeId,
        start: usize,
        end: usize,
        replacement: &str,
    ) -> bool {
        if self.text(id).is_none() {
            return false;
        }
        self.splice_text(id, start, end, replacement);
        true
    }

    /// All text nodes in document order.
    pub fn text_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if matches!(self.nodes[id].data, NodeData::Text(_)) {
                out.push(id);
            }
            for &child in self.nodes[id].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// First element carrying the given attribute, in document order.
    pub fn find_element_with_attr(&self, name: &str) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let NodeData::Element { attrs, .. } = &self.nodes[id].data {
                if attrs.iter().any(|(attr, _)| attr == name) {
                    return Some(id);
                }
            }
            for &child in self.nodes[id].children.iter().rev() {
                stack.push(child);
            }
        }
        None
    }

    /// Concatenated text content of the whole region.
    pub fn text_content(&self) -> String {
        self.text_nodes()
            .iter()
            .filter_map(|&id| self.text(id))
            .collect()
    }

    /// Serialize the region's children back to HTML.
    pub fn to_html(&self) -> String {
        let fragment: Vec<HtmlNode> = self.nodes[self.root]
            .children
            .iter()
            .map(|&c| self.to_html_node(c))
            .collect();
        html::serialize(&fragment)
    }

    fn to_html_node(&self, id: NodeId) -> HtmlNode {
        match &self.nodes[id].data {
            NodeData::Text(text) => HtmlNode::Text(text.clone()),
            NodeData::Element { tag, attrs } => HtmlNode::Element {
                tag: tag.clone(),
                attrs: attrs.clone(),
                children: self.nodes[id]
                    .children
                    .iter()
                    .map(|&c| self.to_html_node(c))
                    .collect(),
            },
        }
    }

    fn text_selection(&self) -> Option<((usize, usize), NodeId)> {
        let (anchor, focus) = self.selection?;
        if anchor.node != focus.node {
            return None;
        }
        self.text(anchor.node)?;
        let (start, end) = if anchor.offset <= focus.offset {
            (anchor.offset, focus.offset)
        } else {
            (focus.offset, anchor.offset)
        };
        Some(((start, end), anchor.node))
    }

    fn set_text(&mut self, id: NodeId, text: &str) {
        if let NodeData::Text(t) = &mut self.nodes[id].data {
            *t = text.to_string();
        }
    }

    fn splice_text(&mut self, id: NodeId, start: usize, end: usize, replacement: &str) {
        if let NodeData::Text(text) = &mut self.nodes[id].data {
            let start_byte = byte_at(text, start);
            let end_byte = byte_at(text, end);
            text.replace_range(start_byte..end_byte, replacement);
        }
    }

    fn attach_fragment(&mut self, parent: NodeId, index: usize, fragment: &[HtmlNode]) -> usize {
        let mut at = index;
        for node in fragment {
            let id = self.build_node(node);
            self.insert_child(parent, at, id);
            at += 1;
        }
        fragment.len()
    }

    fn build_node(&mut self, node: &HtmlNode) -> NodeId {
        match node {
            HtmlNode::Text(text) => self.create_text(text),
            HtmlNode::Element {
                tag,
                attrs,
                children,
            } => {
                let id = self.create_element(tag, attrs.clone());
                for child in children {
                    let child_id = self.build_node(child);
                    self.append_child(id, child_id);
                }
                id
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_field_insert_command() {
        let mut field = TextField::with_value("hello world");
        field.set_selection(6, 11);
        assert!(field.exec_insert_text("there"));
        assert_eq!(field.value(), "hello there");
        assert_eq!(field.selection(), Some((11, 11)));
        assert_eq!(field.events(), &[InputEvent::InsertText]);
    }

    #[test]
    fn test_text_field_command_unsupported() {
        let mut field = TextField::with_value("abc").without_edit_commands();
        field.set_selection(0, 3);
        assert!(!field.exec_insert_text("x"));
        assert_eq!(field.value(), "abc");

        field.replace_range_direct(0, 3, "x");
        assert_eq!(field.value(), "x");
        assert_eq!(field.events(), &[InputEvent::Synthetic]);
    }

    #[test]
    fn test_text_field_delete_selection() {
        let mut field = TextField::with_value("a\u{200b}b");
        field.set_selection(1, 2);
        assert!(field.exec_delete());
        assert_eq!(field.value(), "ab");
        assert_eq!(field.selection(), Some((1, 1)));
    }

    #[test]
    fn test_text_field_selection_clamped() {
        let mut field = TextField::with_value("ab");
        field.set_selection(5, 9);
        assert_eq!(field.selection(), Some((2, 2)));
    }

    #[test]
    fn test_text_field_multibyte_offsets() {
        let mut field = TextField::with_value("héllo");
        field.set_selection(1, 2);
        assert!(field.exec_insert_text("e"));
        assert_eq!(field.value(), "hello");
    }

    #[test]
    fn test_rich_area_from_html_round_trip() {
        let area = RichArea::from_html("Hi <b>there</b>");
        assert_eq!(area.to_html(), "Hi <b>there</b>");
        assert_eq!(area.text_content(), "Hi there");
    }

    #[test]
    fn test_rich_area_insert_text_in_node() {
        let mut area = RichArea::from_html("hello world");
        let node = area.text_nodes()[0];
        area.set_selection_in_text(node, 6, 11);
        assert!(area.exec_insert_text("there"));
        assert_eq!(area.text_content(), "hello there");
        assert_eq!(area.caret(), Some(Caret { node, offset: 11 }));
    }

    #[test]
    fn test_rich_area_insert_html_splits_text() {
        let mut area = RichArea::from_html("ab");
        let node = area.text_nodes()[0];
        area.set_selection_in_text(node, 1, 1);
        assert!(area.exec_insert_html("<i>x</i>"));
        assert_eq!(area.to_html(), "a<i>x</i>b");
        // Caret sits after the inserted element, before the tail text.
        assert_eq!(area.caret(), Some(Caret { node: area.root(), offset: 2 }));
    }

    #[test]
    fn test_rich_area_insert_html_rejects_cross_node_range() {
        let mut area = RichArea::from_html("a<b>c</b>");
        let text_nodes = area.text_nodes();
        area.selection = Some((
            Caret { node: text_nodes[0], offset: 0 },
            Caret { node: text_nodes[1], offset: 1 },
        ));
        assert!(!area.exec_insert_html("<i>x</i>"));
        assert_eq!(area.to_html(), "a<b>c</b>");
    }

    #[test]
    fn test_rich_area_detach_adjusts_caret() {
        let mut area = RichArea::from_html("a<span></span>b");
        let root = area.root();
        let span = area.children(root)[1];
        area.set_caret(root, 3);
        area.detach(span);
        assert_eq!(area.caret(), Some(Caret { node: root, offset: 2 }));
        assert_eq!(area.to_html(), "ab");
    }
}
