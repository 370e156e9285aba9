//! Panic recovery for request handlers.

use std::any::Any;

use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};

/// Turns a handler panic into a plain-text 500 and logs the panic message.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicResponder;

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        let detail = if let Some(s) = err.downcast_ref::<String>() {
            s.as_str()
        } else if let Some(s) = err.downcast_ref::<&str>() {
            s
        } else {
            "unknown panic payload"
        };
        tracing::error!(panic = %detail, "Request handler panicked");

        let mut response = Response::new(Body::from("Internal server error"));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

/// Create the layer that keeps one failing request from taking the server down.
pub fn create_catch_panic_layer() -> CatchPanicLayer<PanicResponder> {
    CatchPanicLayer::custom(PanicResponder)
}
