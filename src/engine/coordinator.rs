//! Tab-key interception and expansion orchestration.
//!
//! One keydown pass runs `Idle → Candidate → Dispatching → (Resolved |
//! Rejected)` to completion; no state survives between keystrokes except
//! the caches. Every do-nothing path is an explicit [`Outcome`] branch,
//! and nothing here is allowed to throw into the host page.

use std::sync::Arc;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::clipboard::ClipboardRead;
use crate::dom::{Key, KeyEvent, PageElement};
use crate::engine::cache::SharedCache;
use crate::engine::context::ExtensionContext;
use crate::engine::surface::{self, EditSurface};
use crate::engine::variables;
use crate::service::protocol::{Request, Response};

/// Trailing typed trigger: `//` followed by a whitespace-free run at the
/// very end of the text before the cursor.
static TRIGGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"//\S+$").expect("trigger pattern"));

/// How one keydown pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A snippet was fetched, resolved, and handed to the surface.
    Matched { shortcut: String },
    /// No trailing trigger, unknown trigger, or unhandled element;
    /// default Tab behavior proceeds.
    NoMatch,
    /// The store had no snippet for the trigger, or the payload was
    /// unusable. Tab stays suppressed; the editor stays unchanged.
    NotFound,
    NotLoggedIn,
    /// The extension context was gone before or during dispatch.
    ContextInvalid,
}

/// A matched trailing trigger: the form the user typed, and the canonical
/// lookup key with one leading slash stripped (typed `//sig` looks up
/// `/sig`), so the typed prefix stays visually distinct from stored data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    pub typed: String,
    pub key: String,
}

/// Match a trailing trigger in the text before the cursor.
pub fn match_trigger(text_before_cursor: &str) -> Option<TriggerMatch> {
    let matched = TRIGGER_RE.find(text_before_cursor)?;
    let typed = matched.as_str().to_string();
    let key = typed[1..].to_string();
    Some(TriggerMatch { typed, key })
}

/// The in-page expansion coordinator.
pub struct ExpansionCoordinator {
    cache: SharedCache,
    context: ExtensionContext,
    clipboard: Arc<dyn ClipboardRead>,
}

impl ExpansionCoordinator {
    pub fn new(
        cache: SharedCache,
        context: ExtensionContext,
        clipboard: Arc<dyn ClipboardRead>,
    ) -> Self {
        Self {
            cache,
            context,
            clipboard,
        }
    }

    /// Handle one capture-phase keydown. Runs to completion, including
    /// the asynchronous continuation after the cross-context round trip,
    /// before the next input event enters this subsystem.
    pub async fn handle_keydown(
        &self,
        event: &mut KeyEvent,
        target: &mut PageElement,
    ) -> Outcome {
        if *event.key() != Key::Tab {
            return Outcome::NoMatch;
        }
        let Some(surface) = surface::surface_for(target) else {
            return Outcome::NoMatch;
        };
        let Some(before) = surface.text_before_cursor() else {
            return Outcome::NoMatch;
        };
        let Some(trigger) = match_trigger(&before) else {
            return Outcome::NoMatch;
        };
        if !self.cache.contains_shortcut(&trigger.key) {
            return Outcome::NoMatch;
        }
        // Known trigger but no live context: leave Tab alone rather than
        // suppress it for a request doomed to fail.
        if !self.context.is_valid() {
            return Outcome::ContextInvalid;
        }

        // The trigger is ours: keep the page from seeing this Tab.
        event.prevent_default();
        event.stop_propagation();

        self.dispatch(&trigger, surface).await
    }

    async fn dispatch(&self, trigger: &TriggerMatch, surface: &mut dyn EditSurface) -> Outcome {
        let request = Request::ExpandShortcut {
            shortcut: trigger.key.clone(),
        };
        let Some(response) = self.context.request(request).await else {
            return Outcome::ContextInvalid;
        };
        let (content, html_content) = match response {
            Response::Snippet {
                content: Some(content),
                html_content,
                ..
            } => (content, html_content),
            // A snippet payload without content is unusable.
            Response::Snippet { .. } => return Outcome::NotFound,
            Response::NotLoggedIn => return Outcome::NotLoggedIn,
            Response::NotFound => return Outcome::NotFound,
            // Not a well-formed reply for this request.
            _ => return Outcome::NotFound,
        };

        let wants_clipboard = variables::needs_clipboard(&content)
            || html_content
                .as_deref()
                .is_some_and(variables::needs_clipboard);
        let clipboard = if wants_clipboard {
            // Read failure substitutes the empty string, never an error.
            self.clipboard.read_text().await.unwrap_or_default()
        } else {
            String::new()
        };

        let snapshot = self.cache.snapshot();
        let resolved = variables::resolve(
            &content,
            html_content.as_deref(),
            &snapshot.variables,
            &clipboard,
        );
        // The typed trigger form decides how many characters to remove.
        if !surface.replace(&trigger.typed, &resolved.plain, resolved.html.as_deref()) {
            debug!("replacement was a no-op for {}", trigger.key);
        }
        Outcome::Matched {
            shortcut: trigger.key.clone(),
        }
    }
}
