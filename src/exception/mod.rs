//! Failure taxonomy and exception resolution.
//!
//! # Responsibilities
//! - Define the `Failure` trait raised by request-time code
//! - Provide the builtin set of response-as-exception signals
//! - Resolve a raised failure plus request context into a response
//!
//! # Design Decisions
//! - Failure kinds carry an explicit, author-maintained ancestor chain
//!   instead of relying on language-level subtyping; handler lookup walks
//!   the chain from the exact kind upward
//! - Response signals are data (status, title, extra headers), not control
//!   flow; they resolve through the builtin mapping unless a user handler
//!   overrides them
//! - A handler that itself fails is NOT caught here; propagation past the
//!   resolver is the caller's top-level boundary

pub mod resolver;

pub use resolver::ExceptionResolver;

use thiserror::Error;

/// A stable identifier for a failure kind.
///
/// Kinds form a hierarchy through the `parent` link. Handler lookup for a
/// raised failure walks from its exact kind through each ancestor, so
/// registering a handler for a parent kind covers every descendant.
///
/// Kinds are declared as statics so the chain is fixed at compile time:
///
/// ```
/// use hearth::exception::FailureKind;
///
/// static STORAGE: FailureKind = FailureKind::new("storage", None);
/// static STORAGE_TIMEOUT: FailureKind = FailureKind::new("storage.timeout", Some(&STORAGE));
/// ```
#[derive(Debug)]
pub struct FailureKind {
    id: &'static str,
    parent: Option<&'static FailureKind>,
}

impl FailureKind {
    pub const fn new(id: &'static str, parent: Option<&'static FailureKind>) -> Self {
        Self { id, parent }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn parent(&self) -> Option<&'static FailureKind> {
        self.parent
    }
}

/// A request-time failure that the exception resolver can route.
///
/// Implementors supply their kind; the default `as_response` probe is
/// overridden only by the builtin response signals.
pub trait Failure: std::error::Error + Send + Sync {
    /// The exact kind of this failure.
    fn kind(&self) -> &'static FailureKind;

    /// The builtin response-as-exception probe. `Some` marks this failure as
    /// a deliberate short-circuit carrying its own status mapping.
    fn as_response(&self) -> Option<&HttpResponseError> {
        None
    }
}

/// Root kind for the builtin response signals. Registering a handler for
/// this kind overrides the builtin mapping for every signal.
pub static HTTP_RESPONSE: FailureKind = FailureKind::new("http-response", None);

pub static REDIRECT: FailureKind = FailureKind::new("http-response.redirect", Some(&HTTP_RESPONSE));
pub static BAD_REQUEST: FailureKind =
    FailureKind::new("http-response.bad-request", Some(&HTTP_RESPONSE));
pub static UNAUTHORIZED: FailureKind =
    FailureKind::new("http-response.unauthorized", Some(&HTTP_RESPONSE));
pub static FORBIDDEN: FailureKind =
    FailureKind::new("http-response.forbidden", Some(&HTTP_RESPONSE));
pub static NOT_FOUND: FailureKind =
    FailureKind::new("http-response.not-found", Some(&HTTP_RESPONSE));
pub static METHOD_NOT_ALLOWED: FailureKind =
    FailureKind::new("http-response.method-not-allowed", Some(&HTTP_RESPONSE));
pub static CONFLICT: FailureKind = FailureKind::new("http-response.conflict", Some(&HTTP_RESPONSE));
pub static GONE: FailureKind = FailureKind::new("http-response.gone", Some(&HTTP_RESPONSE));
pub static INTERNAL_SERVER_ERROR: FailureKind =
    FailureKind::new("http-response.internal-server-error", Some(&HTTP_RESPONSE));
pub static BAD_GATEWAY: FailureKind =
    FailureKind::new("http-response.bad-gateway", Some(&HTTP_RESPONSE));
pub static SERVICE_UNAVAILABLE: FailureKind =
    FailureKind::new("http-response.service-unavailable", Some(&HTTP_RESPONSE));

/// A deliberate response-as-exception signal.
///
/// Raising one of these from a handler short-circuits the request to the
/// mapped status and title body. It is not a defect: the resolver applies
/// the builtin mapping unless the embedder registered a handler for the
/// signal's exact kind or for [`HTTP_RESPONSE`].
#[derive(Debug, Clone, Error)]
#[error("{status} {title}")]
pub struct HttpResponseError {
    status: u16,
    title: String,
    headers: Vec<(String, String)>,
    kind: &'static FailureKind,
}

impl HttpResponseError {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Map-specific headers, e.g. the redirect target.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// 302 with a `Location` header.
    pub fn redirect(location: &str) -> Self {
        Self {
            status: 302,
            title: "Found".to_string(),
            headers: vec![("Location".to_string(), location.to_string())],
            kind: &REDIRECT,
        }
    }

    pub fn bad_request() -> Self {
        Self::plain(400, "Bad request", &BAD_REQUEST)
    }

    pub fn unauthorized() -> Self {
        Self::plain(401, "Unauthorized", &UNAUTHORIZED)
    }

    pub fn forbidden() -> Self {
        Self::plain(403, "Forbidden", &FORBIDDEN)
    }

    pub fn not_found() -> Self {
        Self::plain(404, "Not found", &NOT_FOUND)
    }

    pub fn method_not_allowed() -> Self {
        Self::plain(405, "Method not allowed", &METHOD_NOT_ALLOWED)
    }

    pub fn conflict() -> Self {
        Self::plain(409, "Conflict", &CONFLICT)
    }

    pub fn gone() -> Self {
        Self::plain(410, "Gone", &GONE)
    }

    pub fn internal_server_error() -> Self {
        Self::plain(500, "Internal server error", &INTERNAL_SERVER_ERROR)
    }

    pub fn bad_gateway() -> Self {
        Self::plain(502, "Bad gateway", &BAD_GATEWAY)
    }

    pub fn service_unavailable() -> Self {
        Self::plain(503, "Service unavailable", &SERVICE_UNAVAILABLE)
    }

    fn plain(status: u16, title: &str, kind: &'static FailureKind) -> Self {
        Self {
            status,
            title: title.to_string(),
            headers: Vec::new(),
            kind,
        }
    }
}

impl Failure for HttpResponseError {
    fn kind(&self) -> &'static FailureKind {
        self.kind
    }

    fn as_response(&self) -> Option<&HttpResponseError> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_kinds_descend_from_http_response() {
        let signal = HttpResponseError::not_found();
        assert_eq!(signal.kind().parent().map(FailureKind::id), Some("http-response"));
    }

    #[test]
    fn redirect_carries_location() {
        let signal = HttpResponseError::redirect("/elsewhere");
        assert_eq!(signal.status(), 302);
        assert_eq!(
            signal.headers(),
            &[("Location".to_string(), "/elsewhere".to_string())]
        );
    }
}
