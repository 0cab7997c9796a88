//! Version 1 envelope
//!
//! Success: `{"message": "", <pagination fields>, "data": [...]}` where `data`
//! is always a sequence; a single item is wrapped in a one-element array and
//! a missing payload becomes `[]`. The pagination fields are always present
//! and are zero when the handler attached no descriptor.
//!
//! Error: `{"message": "<descriptor message>"}` with the descriptor's status
//! as the transport status.

use serde::Serialize;

use super::{encode, EnvelopeRenderer, HandlerResult, RenderedResponse};
use crate::pagination::PaginationDescriptor;
use crate::registry::{ErrorRegistry, ResolvedError};

#[derive(Serialize)]
struct SuccessBody<'a, T> {
    message: &'a str,
    #[serde(flatten)]
    pagination: PaginationDescriptor,
    data: &'a [T],
}

/// Renderer for the version 1 envelope
#[derive(Debug, Clone, Default)]
pub struct EnvelopeV1 {
    registry: ErrorRegistry,
}

impl EnvelopeV1 {
    /// Create a renderer backed by `registry`
    #[must_use]
    pub fn new(registry: ErrorRegistry) -> Self {
        Self { registry }
    }
}

impl EnvelopeRenderer for EnvelopeV1 {
    fn registry(&self) -> &ErrorRegistry {
        &self.registry
    }

    fn render_success<T: Serialize>(&self, result: &HandlerResult<T>) -> RenderedResponse {
        let body = SuccessBody {
            message: "",
            pagination: result.pagination.unwrap_or_default(),
            data: result.payload.as_slice(),
        };
        encode(result.status_or_ok(), &body)
    }

    fn render_error<T>(
        &self,
        resolved: &ResolvedError,
        _result: &HandlerResult<T>,
    ) -> RenderedResponse {
        let descriptor = resolved.descriptor();
        encode(descriptor.status(), descriptor)
    }
}
