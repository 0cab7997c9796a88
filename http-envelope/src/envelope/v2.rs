//! Version 2 envelope
//!
//! Every outcome is `{"status", "message": [...], "success", "data"}`.
//!
//! On success the transport status is 200 and `status` echoes the handler's
//! status (200 unless overridden). `data` is the item as-is, the list as-is,
//! or `[]` when absent. With pagination attached, `data` becomes
//! `{<pagination fields>, "data": <payload>}`.
//!
//! On error the transport status is two-tier: 400, or 500 when the error
//! fell back to the unknown descriptor. The body `status` carries the
//! descriptor's own status so clients can branch on domain intent.

use axum::http::StatusCode;
use serde::Serialize;

use super::{encode, EnvelopeRenderer, HandlerResult, Payload, RenderedResponse};
use crate::pagination::PaginationDescriptor;
use crate::registry::{ErrorRegistry, ResolvedError};

#[derive(Serialize)]
struct Body<'a, D> {
    status: u16,
    message: &'a [String],
    success: bool,
    data: D,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Data<'a, T> {
    One(&'a T),
    Many(&'a [T]),
}

#[derive(Serialize)]
struct Paginated<'a, T> {
    #[serde(flatten)]
    pagination: PaginationDescriptor,
    data: Data<'a, T>,
}

/// Renderer for the version 2 envelope
#[derive(Debug, Clone, Default)]
pub struct EnvelopeV2 {
    registry: ErrorRegistry,
}

impl EnvelopeV2 {
    /// Create a renderer backed by `registry`
    #[must_use]
    pub fn new(registry: ErrorRegistry) -> Self {
        Self { registry }
    }
}

impl EnvelopeRenderer for EnvelopeV2 {
    fn registry(&self) -> &ErrorRegistry {
        &self.registry
    }

    fn render_success<T: Serialize>(&self, result: &HandlerResult<T>) -> RenderedResponse {
        let data = match result.payload {
            Payload::Item(ref item) => Data::One(item),
            ref payload => Data::Many(payload.as_slice()),
        };
        let status = result.status_or_ok().as_u16();

        match result.pagination {
            Some(pagination) => encode(
                StatusCode::OK,
                &Body {
                    status,
                    message: &result.messages,
                    success: true,
                    data: Paginated { pagination, data },
                },
            ),
            None => encode(
                StatusCode::OK,
                &Body {
                    status,
                    message: &result.messages,
                    success: true,
                    data,
                },
            ),
        }
    }

    fn render_error<T>(
        &self,
        resolved: &ResolvedError,
        result: &HandlerResult<T>,
    ) -> RenderedResponse {
        let descriptor = resolved.descriptor();
        let transport = if resolved.is_fallback() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::BAD_REQUEST
        };

        let fallback_message = [descriptor.message().to_string()];
        let message = if result.messages.is_empty() {
            &fallback_message[..]
        } else {
            &result.messages[..]
        };

        encode(
            transport,
            &Body {
                status: descriptor.status().as_u16(),
                message,
                success: false,
                data: [(); 0],
            },
        )
    }
}
