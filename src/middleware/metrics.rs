//! HTTP observability middleware
//!
//! Tower Layer/Service combining request id propagation and request metrics.
//! Path labels are normalized per route table so application keys and client
//! ids never become label values.

use axum::{body::Body, http::Request, response::Response};
use metrics::{counter, gauge, histogram};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tower Layer for HTTP observability (request ID + metrics).
#[derive(Clone, Copy)]
pub struct ObservabilityLayer {
    normalize: fn(&str) -> String,
}

impl ObservabilityLayer {
    /// Labels for the REST API route table
    pub fn api() -> Self {
        Self {
            normalize: normalize_api_path,
        }
    }

    /// Labels for gateway traffic
    pub fn gateway() -> Self {
        Self {
            normalize: normalize_gateway_path,
        }
    }
}

impl<S> Layer<S> for ObservabilityLayer {
    type Service = ObservabilityMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ObservabilityMiddleware {
            inner,
            normalize: self.normalize,
        }
    }
}

/// Tower Service that records HTTP metrics and propagates request IDs.
#[derive(Clone)]
pub struct ObservabilityMiddleware<S> {
    inner: S,
    normalize: fn(&str) -> String,
}

impl<S> Service<Request<Body>> for ObservabilityMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let method = request.method().to_string();
        let path = (self.normalize)(request.uri().path());

        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        gauge!("authx_http_requests_in_flight").increment(1.0);
        let start = Instant::now();

        let mut inner = self.inner.clone();
        let span = tracing::info_span!("request", request_id = %request_id);

        Box::pin(
            async move {
                let result = inner.call(request).await;
                gauge!("authx_http_requests_in_flight").decrement(1.0);
                let mut response = result?;

                let status = response.status().as_u16().to_string();
                counter!("authx_http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status)
                    .increment(1);
                histogram!("authx_http_request_duration_seconds", "method" => method, "path" => path)
                    .record(start.elapsed().as_secs_f64());

                if let Ok(val) = request_id.parse() {
                    response.headers_mut().insert(REQUEST_ID_HEADER, val);
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Collapse application keys, client ids and UUIDs in REST paths.
fn normalize_api_path(path: &str) -> String {
    let mut previous = "";
    path.split('/')
        .map(|seg| {
            let label = match previous {
                "app" if !seg.is_empty() => "{app_key}",
                "client" if !seg.is_empty() => "{client_id}",
                _ if looks_like_uuid(seg) => "{id}",
                _ => seg,
            };
            previous = seg;
            label
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Gateway paths are keyed by application; everything below it is dropped.
fn normalize_gateway_path(path: &str) -> String {
    match path {
        "/health" | "/ready" | "/metrics" => path.to_string(),
        "/" | "" => "/".to_string(),
        _ => "/{app_key}".to_string(),
    }
}

fn looks_like_uuid(s: &str) -> bool {
    s.len() == 36 && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}
