//! Error identities and the registry that maps them to client-facing descriptors
//!
//! Business handlers fail with a [`HandlerError`], which carries an
//! [`ErrorKind`] identity. At render time the renderer asks the service's
//! [`ErrorRegistry`] which [`ErrorDescriptor`] (message and status code) that
//! identity maps to. Anything the registry does not know collapses to the
//! generic "Unknown error" descriptor at 500, so internal error text never
//! reaches the client.
//!
//! The registry is assembled once at startup through an
//! [`ErrorRegistryBuilder`] and then frozen; the frozen registry is immutable
//! and cheap to clone into every renderer.
//!
//! # Example
//!
//! ```rust
//! use axum::http::StatusCode;
//! use http_envelope::registry::{ErrorDescriptor, ErrorKind, ErrorRegistry, HandlerError};
//!
//! let mut builder = ErrorRegistry::builder();
//! builder.register(
//!     ErrorKind::custom("user_not_found"),
//!     ErrorDescriptor::new(StatusCode::NOT_FOUND, "User not found"),
//! );
//! let registry = builder.freeze();
//!
//! let resolved = registry.resolve(&HandlerError::new(ErrorKind::custom("user_not_found")));
//! assert_eq!(resolved.descriptor().status(), StatusCode::NOT_FOUND);
//! assert!(!resolved.is_fallback());
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;

/// Identity of a failure, used as the registry key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller is not authorized
    Unauthorized,
    /// Required header missing or malformed
    InvalidHeader,
    /// Header signature did not verify
    InvalidHeaderSignature,
    /// Request timestamp is outside the accepted window
    ExpiredRequest,
    /// Request body exceeded the accepted size
    EntityTooLarge,
    /// Anything without a more specific identity
    Unknown,
    /// Service-defined identity
    Custom(Cow<'static, str>),
}

impl ErrorKind {
    /// Identities every registry is seeded with
    pub const BUILTIN: [ErrorKind; 6] = [
        Self::Unauthorized,
        Self::InvalidHeader,
        Self::InvalidHeaderSignature,
        Self::ExpiredRequest,
        Self::EntityTooLarge,
        Self::Unknown,
    ];

    /// Create a service-defined identity
    pub fn custom(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Custom(name.into())
    }

    /// Default descriptor for a built-in identity, `None` for custom ones
    #[must_use]
    pub fn builtin_descriptor(&self) -> Option<ErrorDescriptor> {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "You are not authorized"),
            Self::InvalidHeader => (StatusCode::BAD_REQUEST, "Invalid/incomplete header"),
            Self::InvalidHeaderSignature => (StatusCode::BAD_REQUEST, "Invalid header signature"),
            Self::ExpiredRequest => (StatusCode::BAD_REQUEST, "Request already expired"),
            Self::EntityTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "Request entity too large"),
            Self::Unknown => (StatusCode::INTERNAL_SERVER_ERROR, UNKNOWN_ERROR_MESSAGE),
            Self::Custom(_) => return None,
        };
        Some(ErrorDescriptor::new(status, message))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::InvalidHeader => write!(f, "invalid_header"),
            Self::InvalidHeaderSignature => write!(f, "invalid_header_signature"),
            Self::ExpiredRequest => write!(f, "expired_request"),
            Self::EntityTooLarge => write!(f, "entity_too_large"),
            Self::Unknown => write!(f, "unknown"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Client-facing message and intended status code for one error identity
///
/// Serializes as `{"message": ...}`; the status code only travels as the
/// transport status (v1) or the body `status` field (v2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDescriptor {
    message: String,
    #[serde(skip)]
    status: StatusCode,
}

impl ErrorDescriptor {
    /// Create a new descriptor
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    /// The generic descriptor unresolvable errors collapse to
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, UNKNOWN_ERROR_MESSAGE)
    }

    /// Client-facing message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Intended status code
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ErrorDescriptor {}

/// Failure returned by a business handler
///
/// The internal `source` is logged server-side when the error is rendered and
/// is never written to the response.
#[derive(Debug)]
pub struct HandlerError {
    kind: ErrorKind,
    descriptor: Option<ErrorDescriptor>,
    source: Option<anyhow::Error>,
}

impl HandlerError {
    /// Create an error with the given identity
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            descriptor: None,
            source: None,
        }
    }

    /// Create an error that carries its own descriptor
    ///
    /// The descriptor is only used when the renderer's registry is empty; a
    /// populated registry always decides by [`ErrorKind`].
    pub fn described(descriptor: ErrorDescriptor) -> Self {
        Self {
            kind: ErrorKind::Unknown,
            descriptor: Some(descriptor),
            source: None,
        }
    }

    /// Attach the underlying cause for server-side logging
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach a descriptor to an error that already has an identity
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: ErrorDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    /// Identity used for registry lookup
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Descriptor carried by the error itself, if any
    #[must_use]
    pub fn descriptor(&self) -> Option<&ErrorDescriptor> {
        self.descriptor.as_ref()
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ref descriptor) = self.descriptor {
            write!(f, " ({})", descriptor)?;
        }
        if let Some(ref source) = self.source {
            write!(f, ": {:#}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn std::error::Error + 'static))
    }
}

impl From<ErrorKind> for HandlerError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<ErrorDescriptor> for HandlerError {
    fn from(descriptor: ErrorDescriptor) -> Self {
        Self::described(descriptor)
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(ErrorKind::Unknown).with_source(err)
    }
}

/// Outcome of resolving a [`HandlerError`] against a registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedError {
    descriptor: ErrorDescriptor,
    fallback: bool,
}

impl ResolvedError {
    fn fallback() -> Self {
        Self {
            descriptor: ErrorDescriptor::unknown(),
            fallback: true,
        }
    }

    /// Descriptor to render
    #[must_use]
    pub fn descriptor(&self) -> &ErrorDescriptor {
        &self.descriptor
    }

    /// Whether the error resolved to the generic unknown-error descriptor
    ///
    /// True on a registry miss, and for any error of kind
    /// [`ErrorKind::Unknown`] resolved by kind, even when the service
    /// registered its own descriptor for `Unknown`.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// Mutable registry used during service startup
///
/// `register` has insert-or-replace semantics; there is no removal.
#[derive(Debug, Clone, Default)]
pub struct ErrorRegistryBuilder {
    entries: HashMap<ErrorKind, ErrorDescriptor>,
}

impl ErrorRegistryBuilder {
    /// Builder seeded with every built-in identity
    #[must_use]
    pub fn new() -> Self {
        let mut builder = Self::empty();
        for kind in ErrorKind::BUILTIN {
            if let Some(descriptor) = kind.builtin_descriptor() {
                builder.entries.insert(kind, descriptor);
            }
        }
        builder
    }

    /// Builder with no entries
    ///
    /// A registry frozen from an empty builder bypasses lookup entirely; see
    /// [`ErrorRegistry::resolve`].
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Map `kind` to `descriptor`, replacing any previous mapping
    pub fn register(&mut self, kind: ErrorKind, descriptor: ErrorDescriptor) -> &mut Self {
        self.entries.insert(kind, descriptor);
        self
    }

    /// Register several mappings at once; later entries win
    pub fn register_all<I>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (ErrorKind, ErrorDescriptor)>,
    {
        self.entries.extend(entries);
        self
    }

    /// Seal the registry; no further writes are possible
    #[must_use]
    pub fn freeze(self) -> ErrorRegistry {
        ErrorRegistry {
            entries: Arc::new(self.entries),
        }
    }
}

/// Read-only error registry shared by every renderer
#[derive(Debug, Clone)]
pub struct ErrorRegistry {
    entries: Arc<HashMap<ErrorKind, ErrorDescriptor>>,
}

impl Default for ErrorRegistry {
    fn default() -> Self {
        ErrorRegistryBuilder::new().freeze()
    }
}

impl ErrorRegistry {
    /// Start a builder seeded with the built-in identities
    #[must_use]
    pub fn builder() -> ErrorRegistryBuilder {
        ErrorRegistryBuilder::new()
    }

    /// A frozen registry with no entries
    #[must_use]
    pub fn empty() -> Self {
        ErrorRegistryBuilder::empty().freeze()
    }

    /// Exact-identity lookup
    #[must_use]
    pub fn lookup(&self, kind: &ErrorKind) -> Option<&ErrorDescriptor> {
        self.entries.get(kind)
    }

    /// Number of registered identities
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no identity is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decide which descriptor a handler error renders as
    ///
    /// With a populated registry the error's kind is looked up and a miss
    /// yields the unknown fallback. With an empty registry lookup is skipped:
    /// the error's own descriptor is used, then the built-in descriptor of
    /// its kind, then the unknown fallback.
    #[must_use]
    pub fn resolve(&self, error: &HandlerError) -> ResolvedError {
        let (found, by_kind) = if self.is_empty() {
            match error.descriptor() {
                Some(descriptor) => (Some(descriptor.clone()), false),
                None => (error.kind().builtin_descriptor(), true),
            }
        } else {
            (self.lookup(error.kind()).cloned(), true)
        };

        match found {
            Some(descriptor) => ResolvedError {
                descriptor,
                fallback: by_kind && *error.kind() == ErrorKind::Unknown,
            },
            None => ResolvedError::fallback(),
        }
    }
}
