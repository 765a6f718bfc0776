//! Hierarchy-aware exception resolution.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::exception::{Failure, FailureKind, HttpResponseError, HTTP_RESPONSE};
use crate::http::RequestContext;

type Handler = Arc<dyn Fn(&dyn Failure, &mut RequestContext) + Send + Sync>;

/// Marks the context as inside exception handling for the duration of a
/// resolution, clearing the flag on drop even if a user handler panics.
struct ExceptionScope {
    flag: Arc<AtomicBool>,
}

impl ExceptionScope {
    fn enter(ctx: &RequestContext) -> Self {
        let flag = ctx.exception_flag();
        flag.store(true, Ordering::SeqCst);
        Self { flag }
    }
}

impl Drop for ExceptionScope {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Maps a raised failure plus the in-flight request context to a response.
///
/// Registration happens before startup; afterwards the resolver is shared
/// read-only between request workers. The negative-lookup cache is the only
/// mutable shared structure, and a lost update there merely costs one
/// redundant ancestor walk.
pub struct ExceptionResolver {
    handlers: HashMap<&'static str, Handler>,
    misses: DashMap<&'static str, ()>,
}

impl ExceptionResolver {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            misses: DashMap::new(),
        }
    }

    /// Register a handler for a failure kind. The handler also covers every
    /// descendant kind without a more specific registration.
    pub fn register<F>(&mut self, kind: &'static FailureKind, handler: F)
    where
        F: Fn(&dyn Failure, &mut RequestContext) + Send + Sync + 'static,
    {
        self.handlers.insert(kind.id(), Arc::new(handler));
        // A registration invalidates earlier negative results.
        self.misses.clear();
    }

    /// Resolve a failure into a response on the context.
    ///
    /// Every failure resolves: exact or ancestor handler, builtin signal
    /// mapping, or the logged generic 500. A panic raised by a user handler
    /// propagates to the caller's boundary; the in-exception-handler flag is
    /// still cleared on unwind.
    pub fn handle(&self, failure: &dyn Failure, ctx: &mut RequestContext) {
        let _scope = ExceptionScope::enter(ctx);

        if let Some(response) = failure.as_response() {
            if self.no_user_handler(failure.kind()) {
                apply_response(response, ctx);
                return;
            }
        }

        match self.lookup(failure.kind()) {
            Some(handler) => handler(failure, ctx),
            None => {
                tracing::error!(
                    request_id = %ctx.request_id(),
                    kind = failure.kind().id(),
                    error = %failure,
                    detail = ?failure,
                    "uncaught exception while servicing request"
                );
                apply_response(&HttpResponseError::internal_server_error(), ctx);
            }
        }
    }

    /// Walk from the exact kind up through its ancestors; first registered
    /// handler wins. A total miss is cached so the next lookup for the same
    /// exact kind is O(1).
    fn lookup(&self, kind: &'static FailureKind) -> Option<&Handler> {
        if self.misses.contains_key(kind.id()) {
            return None;
        }

        let mut current = Some(kind);
        while let Some(candidate) = current {
            if let Some(handler) = self.handlers.get(candidate.id()) {
                return Some(handler);
            }
            current = candidate.parent();
        }

        self.misses.insert(kind.id(), ());
        None
    }

    /// True when neither the exact signal kind nor the generic
    /// response-signal kind has a user registration.
    fn no_user_handler(&self, kind: &FailureKind) -> bool {
        !self.handlers.contains_key(kind.id()) && !self.handlers.contains_key(HTTP_RESPONSE.id())
    }
}

impl Default for ExceptionResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_response(response: &HttpResponseError, ctx: &mut RequestContext) {
    ctx.status(response.status());
    for (name, value) in response.headers() {
        ctx.set_header(name, value);
    }
    ctx.text(response.title());
}
