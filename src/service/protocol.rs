//! Cross-context message protocol between the in-page coordinator and
//! the background snippet service.

use serde::{Deserialize, Serialize};

/// Request sent from a content context to the background service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    ExpandShortcut { shortcut: String },
    GetShortcuts,
    GetStatus,
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    #[serde(rename_all = "camelCase")]
    Snippet {
        name: String,
        /// Absent content marks a payload the coordinator must reject.
        #[serde(default)]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        html_content: Option<String>,
    },
    NotFound,
    NotLoggedIn,
    Shortcuts {
        shortcuts: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Status {
        logged_in: bool,
        shortcut_count: usize,
        user_email: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = Request::ExpandShortcut {
            shortcut: "/sig".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"type":"EXPAND_SHORTCUT","shortcut":"/sig"}"#
        );
    }

    #[test]
    fn test_snippet_response_wire_format() {
        let response = Response::Snippet {
            name: "Signature".to_string(),
            content: Some("Best, Jane".to_string()),
            html_content: None,
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"type":"SNIPPET","name":"Signature","content":"Best, Jane"}"#
        );
    }

    #[test]
    fn test_status_response_wire_format() {
        let response = Response::Status {
            logged_in: false,
            shortcut_count: 0,
            user_email: None,
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"type":"STATUS","loggedIn":false,"shortcutCount":0,"userEmail":null}"#
        );
    }
}
