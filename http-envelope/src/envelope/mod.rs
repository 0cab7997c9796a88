//! Response envelopes
//!
//! A business handler returns a [`HandlerResult`]; an [`EnvelopeRenderer`]
//! turns it into a [`RenderedResponse`] (status code plus serialized body).
//! Two wire protocols are supported:
//!
//! - [`EnvelopeV1`]: `{ "message", <pagination fields>, "data": [...] }` on
//!   success, `{ "message" }` on error with the descriptor's status.
//! - [`EnvelopeV2`]: `{ "status", "message": [...], "success", "data" }`
//!   for every outcome.
//!
//! Results whose payload is [`Payload::Raw`] bypass the envelope in both
//! versions and are serialized verbatim.
//!
//! # Example
//!
//! ```rust
//! use http_envelope::envelope::{EnvelopeRenderer, EnvelopeV2, HandlerResult};
//! use http_envelope::registry::ErrorRegistry;
//!
//! let renderer = EnvelopeV2::new(ErrorRegistry::default());
//! let rendered = renderer.render(&HandlerResult::item("OK").with_message("success msg"));
//!
//! assert_eq!(rendered.status().as_u16(), 200);
//! assert_eq!(
//!     rendered.body(),
//!     r#"{"status":200,"message":["success msg"],"success":true,"data":"OK"}"#.as_bytes()
//! );
//! ```

mod v1;
mod v2;

pub use v1::EnvelopeV1;
pub use v2::EnvelopeV2;

use std::fmt;

use axum::{
    body::Bytes,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::pagination::PaginationDescriptor;
use crate::registry::{ErrorRegistry, HandlerError, ResolvedError};

/// Body written when the response itself cannot be serialized
pub const MARSHAL_FAILURE_BODY: &str = "Failed to marshal response";

/// Shape of the success payload, declared by the handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<T> {
    /// No payload
    Empty,
    /// A single object or scalar
    Item(T),
    /// A sequence of items
    List(Vec<T>),
    /// Pre-formatted payload serialized verbatim, without an envelope
    Raw(T),
}

impl<T> Payload<T> {
    /// View the payload as a sequence: empty, one element, or the list itself
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Empty => &[],
            Self::Item(item) | Self::Raw(item) => std::slice::from_ref(item),
            Self::List(items) => items,
        }
    }
}

/// Everything a business handler hands to the renderer
///
/// Built fresh per request and rendered once. `messages` are only emitted by
/// the v2 envelope.
#[derive(Debug)]
pub struct HandlerResult<T = serde_json::Value> {
    /// Success payload
    pub payload: Payload<T>,
    /// Status override for the success path, 200 when unset
    pub status: Option<StatusCode>,
    /// Page counters to inline into the envelope
    pub pagination: Option<PaginationDescriptor>,
    /// Failure; when set the payload is ignored
    pub error: Option<HandlerError>,
    /// Human-readable messages, in order
    pub messages: Vec<String>,
}

impl<T> Default for HandlerResult<T> {
    fn default() -> Self {
        Self {
            payload: Payload::Empty,
            status: None,
            pagination: None,
            error: None,
            messages: Vec::new(),
        }
    }
}

impl<T> HandlerResult<T> {
    /// Successful result without a payload
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Successful result carrying a single item
    #[must_use]
    pub fn item(item: T) -> Self {
        Self {
            payload: Payload::Item(item),
            ..Self::default()
        }
    }

    /// Successful result carrying a sequence
    #[must_use]
    pub fn list(items: Vec<T>) -> Self {
        Self {
            payload: Payload::List(items),
            ..Self::default()
        }
    }

    /// Successful result rendered verbatim, bypassing the envelope
    #[must_use]
    pub fn raw(value: T) -> Self {
        Self {
            payload: Payload::Raw(value),
            ..Self::default()
        }
    }

    /// Failed result
    #[must_use]
    pub fn error(error: impl Into<HandlerError>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Override the success status code
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach page counters
    #[must_use]
    pub fn with_pagination(mut self, pagination: PaginationDescriptor) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Append a message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    /// Append several messages
    #[must_use]
    pub fn with_messages<I, M>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.messages.extend(messages.into_iter().map(Into::into));
        self
    }

    /// Success status, defaulting to 200
    #[must_use]
    pub fn status_or_ok(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }
}

impl<T, E> From<Result<T, E>> for HandlerResult<T>
where
    E: Into<HandlerError>,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(item) => Self::item(item),
            Err(err) => Self::error(err),
        }
    }
}

/// A fully rendered response: status code, content type and body bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    status: StatusCode,
    content_type: HeaderValue,
    body: Bytes,
}

impl RenderedResponse {
    /// A JSON response
    pub fn json(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: HeaderValue::from_static("application/json"),
            body: body.into(),
        }
    }

    /// The fixed plain-text 500 written when serialization fails
    #[must_use]
    pub fn marshal_failure() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            content_type: HeaderValue::from_static("text/plain; charset=utf-8"),
            body: Bytes::from_static(MARSHAL_FAILURE_BODY.as_bytes()),
        }
    }

    /// Transport status code
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Content type of the body
    #[must_use]
    pub fn content_type(&self) -> &HeaderValue {
        &self.content_type
    }

    /// Serialized body
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl IntoResponse for RenderedResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, self.content_type);
        response
    }
}

/// Serialize `body` as JSON, degrading to [`RenderedResponse::marshal_failure`]
pub(crate) fn encode<B>(status: StatusCode, body: &B) -> RenderedResponse
where
    B: Serialize + ?Sized,
{
    match serde_json::to_vec(body) {
        Ok(bytes) => RenderedResponse::json(status, bytes),
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize response body");
            RenderedResponse::marshal_failure()
        }
    }
}

/// Renders handler results into one envelope protocol
///
/// Implementors provide the success and error shapes; [`render`] handles the
/// routing between them, the raw passthrough, and server-side error logging.
///
/// [`render`]: EnvelopeRenderer::render
pub trait EnvelopeRenderer: Clone + Send + Sync + 'static {
    /// Registry consulted on the error path
    fn registry(&self) -> &ErrorRegistry;

    /// Render a successful, non-raw result
    fn render_success<T: Serialize>(&self, result: &HandlerResult<T>) -> RenderedResponse;

    /// Render a failed result whose error has already been resolved
    fn render_error<T>(&self, resolved: &ResolvedError, result: &HandlerResult<T>)
        -> RenderedResponse;

    /// Render any handler result
    ///
    /// Pure over `result`: rendering the same value twice yields identical
    /// responses.
    fn render<T: Serialize>(&self, result: &HandlerResult<T>) -> RenderedResponse {
        if let Some(ref error) = result.error {
            let resolved = self.registry().resolve(error);
            tracing::error!(
                kind = %error.kind(),
                status = resolved.descriptor().status().as_u16(),
                fallback = resolved.is_fallback(),
                error = %error,
                "Handler returned an error"
            );
            return self.render_error(&resolved, result);
        }

        match result.payload {
            Payload::Raw(ref value) => encode(result.status_or_ok(), value),
            _ => self.render_success(result),
        }
    }
}

/// Envelope protocol version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeVersion {
    /// Single message string, data always a sequence
    #[default]
    V1,
    /// Message list, success flag and echoed status
    V2,
}

impl EnvelopeVersion {
    /// Parse version from string (e.g., "v1", "V2", "1")
    pub fn parse(s: &str) -> Option<Self> {
        let lowercase = s.trim().to_lowercase();
        match lowercase.trim_start_matches('v') {
            "1" => Some(Self::V1),
            "2" => Some(Self::V2),
            _ => None,
        }
    }
}

impl fmt::Display for EnvelopeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
        }
    }
}

/// Either envelope, chosen at runtime
#[derive(Debug, Clone)]
pub enum Envelope {
    /// Version 1 envelope
    V1(EnvelopeV1),
    /// Version 2 envelope
    V2(EnvelopeV2),
}

impl Envelope {
    /// Build the renderer for `version`
    #[must_use]
    pub fn new(version: EnvelopeVersion, registry: ErrorRegistry) -> Self {
        match version {
            EnvelopeVersion::V1 => Self::V1(EnvelopeV1::new(registry)),
            EnvelopeVersion::V2 => Self::V2(EnvelopeV2::new(registry)),
        }
    }

    /// Protocol version of this renderer
    #[must_use]
    pub fn version(&self) -> EnvelopeVersion {
        match self {
            Self::V1(_) => EnvelopeVersion::V1,
            Self::V2(_) => EnvelopeVersion::V2,
        }
    }
}

impl EnvelopeRenderer for Envelope {
    fn registry(&self) -> &ErrorRegistry {
        match self {
            Self::V1(renderer) => renderer.registry(),
            Self::V2(renderer) => renderer.registry(),
        }
    }

    fn render_success<T: Serialize>(&self, result: &HandlerResult<T>) -> RenderedResponse {
        match self {
            Self::V1(renderer) => renderer.render_success(result),
            Self::V2(renderer) => renderer.render_success(result),
        }
    }

    fn render_error<T>(
        &self,
        resolved: &ResolvedError,
        result: &HandlerResult<T>,
    ) -> RenderedResponse {
        match self {
            Self::V1(renderer) => renderer.render_error(resolved, result),
            Self::V2(renderer) => renderer.render_error(resolved, result),
        }
    }
}
