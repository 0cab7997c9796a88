//! # http-envelope
//!
//! Uniform response envelopes for axum services. Handlers return a
//! [`HandlerResult`](envelope::HandlerResult); the library renders it into a
//! JSON envelope and maps failures to status codes through a shared
//! registry.
//!
//! ## Features
//!
//! - **Envelopes**: v1 (`message` + inlined pagination + `data` array) and
//!   v2 (`status`, `message` list, `success`, `data`)
//! - **Error registry**: error identity to status and public message, with
//!   an unknown-error fallback that never leaks internal detail
//! - **Pagination**: page/limit parsing, offset computation and page
//!   counters, available as an axum extractor
//! - **Dispatch adapter**: wraps handlers as tower services, with optional
//!   non-destructive request body logging
//!
//! ## Example
//!
//! ```rust,no_run
//! use axum::{extract::Request, http::StatusCode, routing::get_service, Router};
//! use http_envelope::prelude::*;
//!
//! async fn list_orders(request: Request) -> HandlerResult<u64> {
//!     let page = PaginationRequest::from_uri(request.uri(), 10, &PaginationFields::default());
//!     let orders: Vec<u64> = (page.offset..page.offset + page.limit).collect();
//!     HandlerResult::list(orders)
//!         .with_pagination(PaginationDescriptor::compute(&page, 1000))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let mut errors = ErrorRegistry::builder();
//!     errors.register(
//!         ErrorKind::custom("out_of_stock"),
//!         ErrorDescriptor::new(StatusCode::CONFLICT, "Item is out of stock"),
//!     );
//!
//!     let dispatcher = config.dispatcher(errors.freeze());
//!     let app: Router = Router::new().route("/orders", get_service(dispatcher.wrap(list_orders)));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
//!         .await
//!         .map_err(|e| Error::Internal(e.to_string()))?;
//!     axum::serve(listener, app)
//!         .await
//!         .map_err(|e| Error::Internal(e.to_string()))?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod observability;
pub mod pagination;
pub mod registry;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        Config, DispatchConfig, EnvelopeConfig, PaginationConfig, ServiceConfig,
    };
    pub use crate::dispatch::{Dispatch, Dispatcher, DEFAULT_MAX_BODY_BYTES};
    pub use crate::envelope::{
        Envelope, EnvelopeRenderer, EnvelopeV1, EnvelopeV2, EnvelopeVersion, HandlerResult,
        Payload, RenderedResponse,
    };
    pub use crate::error::{Error, Result};
    pub use crate::observability::init_tracing;
    pub use crate::pagination::{
        PaginationDescriptor, PaginationFields, PaginationRequest, DEFAULT_PAGE_SIZE,
    };
    pub use crate::registry::{
        ErrorDescriptor, ErrorKind, ErrorRegistry, ErrorRegistryBuilder, HandlerError,
        ResolvedError,
    };
}
