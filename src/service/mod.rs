//! The background half of the extension.
//!
//! Owns the authenticated relationship with the remote snippet store:
//! the service task, the HTTP client behind its seam, the shared storage
//! area, and the cross-context message protocol.

pub mod api;
pub mod background;
pub mod protocol;
pub mod storage;
