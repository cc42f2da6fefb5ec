//! Snipflow - text expansion engine for snippet shortcuts.
//!
//! Snipflow turns short typed triggers into pre-authored, possibly
//! rich-text, possibly parameterized content, inside any editable surface
//! the host exposes. The crate is split the way the product is:
//!
//! # Architecture
//!
//! - [`engine`] - the in-page half: Tab interception, trigger matching,
//!   variable resolution, and replacement across plain and rich-text
//!   surfaces
//! - [`service`] - the background half: the authenticated snippet store
//!   client, the TTL-bounded shortcut cache, and the shared storage area
//! - [`dom`] - the in-memory model of the editable surfaces the engine
//!   drives
//! - [`clipboard`] - clipboard access behind a seam
//!
//! # Example
//!
//! ```ignore
//! use snipflow::{ExpansionCoordinator, ServiceConfig, SnippetService};
//!
//! let (handle, _task) = SnippetService::new(api, storage, ServiceConfig::default()).spawn();
//! let coordinator = ExpansionCoordinator::new(cache, ExtensionContext::new(handle), clipboard);
//! let outcome = coordinator.handle_keydown(&mut event, &mut element).await;
//! ```

// Public modules
pub mod clipboard;
pub mod dom;
pub mod engine;
pub mod service;

// Internal modules
mod error;

// Re-export commonly used types for convenience
pub use clipboard::{ClipboardRead, SystemClipboard};
pub use dom::{Key, KeyEvent, PageElement, RichArea, TextField};
pub use engine::cache::{CacheSnapshot, SharedCache};
pub use engine::context::ExtensionContext;
pub use engine::coordinator::{ExpansionCoordinator, Outcome};
pub use engine::variables::{StaticVariable, VariableScope};
pub use error::{SnipflowError, SnipflowResult};
pub use service::api::{HttpSnippetApi, SnippetApi};
pub use service::background::{ServiceConfig, ServiceHandle, SnippetService};
pub use service::storage::StorageArea;
