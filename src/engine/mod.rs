//! The in-page expansion engine.
//!
//! Everything that runs inside a content context: surface classification,
//! trigger matching, variable resolution, cursor-marker handling, the
//! local trigger/variable caches, and the guard around cross-context
//! messaging.

pub mod cache;
pub mod context;
pub mod coordinator;
pub mod cursor;
pub mod plain;
pub mod rich;
pub mod surface;
pub mod variables;
