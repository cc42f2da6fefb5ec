//! Extension-context guard.
//!
//! Answers "is cross-context messaging currently possible?". A positive
//! answer is not a durable guarantee: the context can become invalid at
//! any point after the check, including mid-await, so every call site
//! that depends on it also swallows its own messaging failures. The
//! pre-check exists to avoid page-visible side effects (suppressing Tab)
//! for requests doomed to fail; the swallow handles the unavoidable race.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::service::background::ServiceHandle;
use crate::service::protocol::{Request, Response};

/// The live binding between a content context and its owning background
/// service.
#[derive(Clone)]
pub struct ExtensionContext {
    handle: ServiceHandle,
    alive: Arc<AtomicBool>,
}

impl ExtensionContext {
    pub fn new(handle: ServiceHandle) -> Self {
        Self {
            handle,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Advisory liveness check, re-evaluated on every call rather than
    /// cached, because invalidation can happen asynchronously between
    /// checks.
    pub fn is_valid(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.handle.is_closed()
    }

    /// Mark the context invalid, as an extension reload would.
    pub fn invalidate(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Send one request and await its reply. Every failure mode — dead
    /// channel, dropped reply, invalidation since the caller's check —
    /// maps to `None`.
    pub async fn request(&self, request: Request) -> Option<Response> {
        if !self.is_valid() {
            return None;
        }
        self.handle.request(request).await.ok()
    }
}
