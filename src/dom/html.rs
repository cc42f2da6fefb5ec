//! Minimal HTML fragment support for the rich-text path.
//!
//! This is not a general HTML parser. It understands exactly what snippet
//! bodies and the cursor marker need: elements with attributes, text, void
//! elements, and the named entities our own escaping produces. Anything
//! malformed degrades to text or gets skipped rather than erroring.

use std::fmt::Write as _;

/// A parsed fragment node.
#[derive(Debug, Clone, PartialEq)]
pub enum HtmlNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<HtmlNode>,
    },
    Text(String),
}

/// Tags that never have children or a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "wbr"];

pub fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// Escape the four HTML-special characters in a substituted value.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        if let Some(end) = rest.find(';') {
            let replacement = match &rest[1..end] {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => None,
            };
            if let Some(ch) = replacement {
                out.push(ch);
                rest = &rest[end + 1..];
                continue;
            }
        }
        // Unrecognized entity: keep the ampersand literally.
        out.push('&');
        rest = &rest[1..];
    }
    out.push_str(rest);
    out
}

/// Parse an HTML fragment into a node list.
pub fn parse_fragment(html: &str) -> Vec<HtmlNode> {
    let mut parser = Parser { input: html, pos: 0 };
    parser.parse_nodes(None)
}

/// Serialize a fragment back to HTML.
pub fn serialize(nodes: &[HtmlNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &HtmlNode, out: &mut String) {
    match node {
        HtmlNode::Text(text) => out.push_str(&escape(text)),
        HtmlNode::Element {
            tag,
            attrs,
            children,
        } => {
            let _ = write!(out, "<{}", tag);
            for (name, value) in attrs {
                if value.is_empty() {
                    let _ = write!(out, " {}", name);
                } else {
                    let _ = write!(out, " {}=\"{}\"", name, escape(value));
                }
            }
            if is_void(tag) && children.is_empty() {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in children {
                    write_node(child, out);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn parse_nodes(&mut self, closing: Option<&str>) -> Vec<HtmlNode> {
        let mut nodes = Vec::new();
        while self.pos < self.input.len() {
            if let Some(tag) = closing {
                if self.at_close_tag(tag) {
                    break;
                }
            }
            let rest = self.rest();
            if rest.starts_with("</") {
                // Close tag for something we never opened; skip it.
                self.skip_past_gt();
                continue;
            }
            if rest.starts_with('<') {
                if let Some(node) = self.parse_element() {
                    nodes.push(node);
                }
                continue;
            }
            let text = self.take_text();
            if !text.is_empty() {
                nodes.push(HtmlNode::Text(unescape(&text)));
            }
        }
        nodes
    }

    fn at_close_tag(&self, tag: &str) -> bool {
        let rest = self.rest();
        let Some(rest) = rest.strip_prefix("</") else {
            return false;
        };
        rest.len() >= tag.len()
            && rest[..tag.len()].eq_ignore_ascii_case(tag)
            && rest[tag.len()..].trim_start().starts_with('>')
    }

    fn skip_past_gt(&mut self) {
        match self.rest().find('>') {
            Some(i) => self.pos += i + 1,
            None => self.pos = self.input.len(),
        }
    }

    fn take_text(&mut self) -> String {
        let rest = self.rest();
        let end = rest.find('<').unwrap_or(rest.len());
        let text = rest[..end].to_string();
        self.pos += end;
        text
    }

    fn parse_element(&mut self) -> Option<HtmlNode> {
        let rest = self.rest();
        let close = match rest.find('>') {
            Some(i) => i,
            None => {
                // Dangling tag with no terminator; drop the tail.
                self.pos = self.input.len();
                return None;
            }
        };
        let inner = &rest[1..close];
        self.pos += close + 1;

        let (inner, self_closing) = match inner.strip_suffix('/') {
            Some(stripped) => (stripped, true),
            None => (inner, false),
        };
        let name_end = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        let tag = inner[..name_end].to_ascii_lowercase();
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        let attrs = parse_attrs(&inner[name_end..]);
        if self_closing || is_void(&tag) {
            return Some(HtmlNode::Element {
                tag,
                attrs,
                children: Vec::new(),
            });
        }
        let children = self.parse_nodes(Some(&tag));
        if self.at_close_tag(&tag) {
            self.skip_past_gt();
        }
        Some(HtmlNode::Element {
            tag,
            attrs,
            children,
        })
    }
}

fn parse_attrs(input: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = input.trim_start();
    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        if name.is_empty() {
            break;
        }
        rest = rest[name_end..].trim_start();
        if let Some(value_part) = rest.strip_prefix('=') {
            let value_part = value_part.trim_start();
            let (value, remainder) = take_attr_value(value_part);
            attrs.push((name, unescape(&value)));
            rest = remainder.trim_start();
        } else {
            attrs.push((name, String::new()));
        }
    }
    attrs
}

fn take_attr_value(input: &str) -> (String, &str) {
    for quote in ['"', '\''] {
        if let Some(inner) = input.strip_prefix(quote) {
            return match inner.find(quote) {
                Some(i) => (inner[..i].to_string(), &inner[i + 1..]),
                None => (inner.to_string(), ""),
            };
        }
    }
    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    (input[..end].to_string(), &input[end..])
}
