//! Request dispatch adapter
//!
//! A [`Dispatcher`] wraps a business handler (`Fn(Request) -> Future<Output =
//! HandlerResult<T>>`) so that every request ends in exactly one call to the
//! envelope renderer. In debug mode the request body is buffered first,
//! replayed into a fresh body for the handler, then logged.
//!
//! ```rust,no_run
//! use axum::{extract::Request, routing::get_service, Router};
//! use http_envelope::prelude::*;
//!
//! async fn hello(_request: Request) -> HandlerResult<&'static str> {
//!     HandlerResult::item("OK")
//! }
//!
//! let dispatcher = Dispatcher::new(EnvelopeV2::new(ErrorRegistry::default()));
//! let app: Router = Router::new().route("/hello", get_service(dispatcher.wrap(hello)));
//! ```

use std::convert::Infallible;
use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::Request,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde::Serialize;
use tower::Service;

use crate::envelope::{EnvelopeRenderer, HandlerResult};
use crate::registry::{ErrorKind, HandlerError};

/// Default limit for bodies buffered in debug mode (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Runs handlers and renders their results with `R`
#[derive(Debug, Clone)]
pub struct Dispatcher<R> {
    renderer: R,
    debug: bool,
    max_body_bytes: usize,
}

impl<R: EnvelopeRenderer> Dispatcher<R> {
    /// Create a dispatcher with debug logging off
    #[must_use]
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            debug: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Toggle request body logging
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Limit for bodies buffered in debug mode
    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// The renderer used for every response
    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Whether request bodies are logged
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Body buffering limit in bytes
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Turn `handler` into a [`tower::Service`] usable as an axum route
    #[must_use]
    pub fn wrap<H>(&self, handler: H) -> Dispatch<R, H> {
        Dispatch {
            dispatcher: self.clone(),
            handler,
        }
    }

    /// Run `handler` on `request` and render its result
    ///
    /// If the body cannot be buffered in debug mode the handler is not
    /// invoked and the failure is rendered instead.
    pub async fn dispatch<H, Fut, T>(&self, request: Request, handler: &H) -> Response
    where
        H: Fn(Request) -> Fut,
        Fut: Future<Output = HandlerResult<T>>,
        T: Serialize,
    {
        let request = if self.debug {
            match self.capture_body(request).await {
                Ok(request) => request,
                Err(error) => {
                    return self
                        .renderer
                        .render(&HandlerResult::<T>::error(error))
                        .into_response()
                }
            }
        } else {
            request
        };

        let result = handler(request).await;
        self.renderer.render(&result).into_response()
    }

    async fn capture_body(&self, request: Request) -> Result<Request, HandlerError> {
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(body_error)?;

        let request = Request::from_parts(parts, Body::from(bytes.clone()));
        tracing::info!(
            method = %request.method(),
            uri = %request.uri(),
            body = %String::from_utf8_lossy(&bytes),
            "[DEBUG] request"
        );

        Ok(request)
    }
}

fn body_error(err: axum::Error) -> HandlerError {
    let root: &(dyn StdError + 'static) = &err;
    let too_large =
        std::iter::successors(Some(root), |&e| e.source()).any(|e| e.is::<LengthLimitError>());

    let kind = if too_large {
        ErrorKind::EntityTooLarge
    } else {
        ErrorKind::Unknown
    };
    HandlerError::new(kind).with_source(err)
}

/// A handler bound to a [`Dispatcher`], implementing [`tower::Service`]
#[derive(Debug, Clone)]
pub struct Dispatch<R, H> {
    dispatcher: Dispatcher<R>,
    handler: H,
}

impl<R, H, Fut, T> Service<Request> for Dispatch<R, H>
where
    R: EnvelopeRenderer,
    H: Fn(Request) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<T>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let dispatcher = self.dispatcher.clone();
        let handler = self.handler.clone();

        Box::pin(async move { Ok(dispatcher.dispatch(request, &handler).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{EnvelopeV1, EnvelopeV2};
    use crate::registry::ErrorRegistry;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn post(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/echo")
            .body(Body::from(body))
            .unwrap()
    }

    async fn echo(request: Request) -> HandlerResult<String> {
        match axum::body::to_bytes(request.into_body(), usize::MAX).await {
            Ok(bytes) => HandlerResult::item(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) => HandlerResult::error(anyhow::Error::new(err)),
        }
    }

    async fn read_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_builder_settings() {
        let dispatcher = Dispatcher::new(EnvelopeV1::default());
        assert!(!dispatcher.is_debug());
        assert_eq!(dispatcher.max_body_bytes(), DEFAULT_MAX_BODY_BYTES);

        let dispatcher = dispatcher.with_debug(true).with_max_body_bytes(16);
        assert!(dispatcher.is_debug());
        assert_eq!(dispatcher.max_body_bytes(), 16);
        assert!(!dispatcher.renderer().registry().is_empty());
    }

    #[tokio::test]
    async fn test_debug_body_is_replayed_to_handler() {
        let dispatcher = Dispatcher::new(EnvelopeV2::default()).with_debug(true);
        let response = dispatcher.dispatch(post(r#"{"name":"gopher"}"#), &echo).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["data"], r#"{"name":"gopher"}"#);
    }

    #[tokio::test]
    async fn test_body_untouched_without_debug() {
        let dispatcher = Dispatcher::new(EnvelopeV2::default()).with_max_body_bytes(1);
        let response = dispatcher.dispatch(post("longer than one byte"), &echo).await;
        assert_eq!(read_json(response).await["data"], "longer than one byte");
    }

    #[tokio::test]
    async fn test_oversized_debug_body_renders_entity_too_large() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = {
            let calls = calls.clone();
            move |request: Request| {
                calls.fetch_add(1, Ordering::SeqCst);
                echo(request)
            }
        };

        let dispatcher = Dispatcher::new(EnvelopeV1::default())
            .with_debug(true)
            .with_max_body_bytes(4);
        let response = dispatcher.dispatch(post("way too long"), &counted).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            read_json(response).await,
            serde_json::json!({"message": "Request entity too large"})
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_body_error_classification() {
        let too_large = axum::body::to_bytes(Body::from("0123456789"), 2)
            .await
            .unwrap_err();
        assert_eq!(body_error(too_large).kind(), &ErrorKind::EntityTooLarge);

        let other = axum::Error::new(std::io::Error::other("connection reset"));
        assert_eq!(body_error(other).kind(), &ErrorKind::Unknown);
    }

    #[tokio::test]
    async fn test_service_renders_once_per_call() {
        let renders = Arc::new(AtomicUsize::new(0));
        let handler = {
            let renders = renders.clone();
            move |_request: Request| {
                let renders = renders.clone();
                async move {
                    renders.fetch_add(1, Ordering::SeqCst);
                    HandlerResult::<()>::error(ErrorKind::Unauthorized)
                }
            }
        };

        let service = Dispatcher::new(EnvelopeV2::new(ErrorRegistry::default())).wrap(handler);
        let response = service.oneshot(post("")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = read_json(response).await;
        assert_eq!(json["status"], 401);
        assert_eq!(json["success"], false);
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }
}
