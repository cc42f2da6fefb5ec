//! Static and dynamic variable resolution for snippet bodies.
//!
//! Substitution is best-effort, not validating: known tokens are replaced,
//! unknown tokens pass through verbatim. Precedence, lowest to highest:
//! workspace-scoped statics, user-scoped statics, computed dynamics.

use std::collections::HashMap;

use chrono::Local;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dom::html;
use crate::engine::cursor;

/// Whether a static variable applies to one user or a whole workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VariableScope {
    User,
    Workspace,
}

/// A static variable from the local variable cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticVariable {
    pub name: String,
    pub value: String,
    pub scope: VariableScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}

/// Resolved snippet bodies ready for surface replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContent {
    pub plain: String,
    pub html: Option<String>,
}

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("token pattern"));

/// Whether content references the clipboard token at all. Gates the
/// asynchronous clipboard read so it is never requested unless needed.
pub fn needs_clipboard(content: &str) -> bool {
    TOKEN_RE
        .captures_iter(content)
        .any(|caps| &caps[1] == "clipboard")
}

/// Resolve both snippet bodies against the variable snapshot and an
/// already-read clipboard string.
pub fn resolve(
    content: &str,
    html_content: Option<&str>,
    variables: &[StaticVariable],
    clipboard: &str,
) -> ResolvedContent {
    let map = build_map(variables);
    let marker_id = Uuid::new_v4().to_string();
    ResolvedContent {
        plain: substitute(content, &map, clipboard, Mode::Plain, &marker_id),
        html: html_content.map(|body| substitute(body, &map, clipboard, Mode::Html, &marker_id)),
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Plain,
    Html,
}

fn substitute(
    input: &str,
    map: &HashMap<String, String>,
    clipboard: &str,
    mode: Mode,
    marker_id: &str,
) -> String {
    let mut cursor_seen = false;
    TOKEN_RE
        .replace_all(input, |caps: &Captures<'_>| {
            let name = &caps[1];
            match name {
                "cursor" => {
                    // At most one marker per expansion; later occurrences
                    // resolve to nothing.
                    if cursor_seen {
                        return String::new();
                    }
                    cursor_seen = true;
                    match mode {
                        Mode::Plain => cursor::SENTINEL.to_string(),
                        Mode::Html => cursor::marker_html(marker_id),
                    }
                }
                "clipboard" => match mode {
                    Mode::Plain => clipboard.to_string(),
                    Mode::Html => html::escape(clipboard),
                },
                _ => match map.get(name) {
                    Some(value) => match mode {
                        Mode::Plain => value.clone(),
                        Mode::Html => html::escape(value),
                    },
                    None => caps[0].to_string(),
                },
            }
        })
        .into_owned()
}

fn build_map(variables: &[StaticVariable]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for var in variables
        .iter()
        .filter(|v| v.scope == VariableScope::Workspace)
    {
        map.insert(var.name.clone(), var.value.clone());
    }
    // Personalization wins over shared defaults.
    for var in variables.iter().filter(|v| v.scope == VariableScope::User) {
        map.insert(var.name.clone(), var.value.clone());
    }
    // Dynamics are applied last into the same map; recomputed per
    // expansion, since their whole point is "now".
    for (name, value) in dynamic_variables() {
        map.insert(name.to_string(), value);
    }
    map
}

/// The computed date/time family, in the local time zone.
fn dynamic_variables() -> Vec<(&'static str, String)> {
    let now = Local::now();
    vec![
        ("date", now.format("%A, %B %-d, %Y").to_string()),
        ("date_short", now.format("%m/%d/%Y").to_string()),
        ("date_iso", now.format("%Y-%m-%d").to_string()),
        ("date_medium", now.format("%b %-d, %Y").to_string()),
        ("time", now.format("%-I:%M %p").to_string()),
        ("time_24", now.format("%H:%M").to_string()),
        ("datetime", now.format("%b %-d, %Y %-I:%M %p").to_string()),
        ("day", now.format("%A").to_string()),
        ("month", now.format("%B").to_string()),
        ("year", now.format("%Y").to_string()),
    ]
}
