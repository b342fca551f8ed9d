// src/server/handler.rs
use futures::future::{self, Ready};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;

use crate::health::HEALTH_PATH;
use crate::metrics::MetricsCollector;

pub const GREETING: &str = "Hello, Goooooo!";
pub const HEALTH_BODY: &str = "OK";

/// The two routes served. `/` is a catch-all, so every path other than
/// `/health` gets the greeting regardless of method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Greeting,
    Health,
}

impl Route {
    pub fn from_path(path: &str) -> Self {
        if path == HEALTH_PATH {
            Route::Health
        } else {
            Route::Greeting
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Route::Greeting => "root",
            Route::Health => "health",
        }
    }

    fn body(self) -> &'static str {
        match self {
            Route::Greeting => GREETING,
            Route::Health => HEALTH_BODY,
        }
    }
}

#[derive(Clone, Default)]
pub struct RequestHandler {
    metrics: Option<Arc<MetricsCollector>>,
}

impl RequestHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Answer `req`. Neither route reads the request body or can fail.
    pub fn respond(&self, req: &Request<Body>) -> Response<Body> {
        let route = Route::from_path(req.uri().path());
        if let Some(metrics) = &self.metrics {
            metrics.record_request(route.label());
        }

        let mut response = Response::new(Body::from(route.body()));
        *response.status_mut() = StatusCode::OK;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        tracing::debug!(method = %req.method(), path = %req.uri().path(), "request");
        future::ready(Ok(self.respond(&req)))
    }
}
