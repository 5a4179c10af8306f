//! Authorizing gateway
//!
//! Requests that passed the gate are forwarded to the upstream configured for
//! their application key. The caller's credentials never leave the gateway; the
//! upstream receives the resolved identity in a single header instead.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request},
    response::Response,
};
use metrics::{counter, histogram};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use url::Url;

use crate::config::GatewayConfig;
use crate::error::{AppError, Result};
use crate::middleware::gate::{decode_segments, TOKEN_COOKIE};
use crate::middleware::AuthContext;

/// Largest request body the gateway buffers before forwarding
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Forwards gated traffic to per-application upstreams
#[derive(Clone)]
pub struct GatewayForwarder {
    client: reqwest::Client,
    routes: HashMap<String, Url>,
    default_upstream: Option<Url>,
    identity_header: HeaderName,
}

impl GatewayForwarder {
    /// Fails on an unparseable upstream URL or identity header name.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let routes = config
            .routes
            .iter()
            .map(|(app_key, upstream)| Ok((app_key.clone(), parse_upstream(upstream)?)))
            .collect::<Result<HashMap<_, _>>>()?;
        let default_upstream = config
            .default_upstream
            .as_deref()
            .map(parse_upstream)
            .transpose()?;
        let identity_header = HeaderName::from_bytes(config.identity_header.as_bytes())
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!(
                    "Invalid identity header '{}': {}",
                    config.identity_header,
                    e
                ))
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            client,
            routes,
            default_upstream,
            identity_header,
        })
    }

    pub fn identity_header(&self) -> &HeaderName {
        &self.identity_header
    }

    /// Resolve the upstream URL for a request path of the form `/{app_key}/rest`.
    ///
    /// A per-application route receives only the rest of the path; the default
    /// upstream receives the original path unchanged. Segments are decoded and
    /// re-encoded one by one, and the result must stay under the base path.
    fn upstream_url(&self, app_key: &str, path: &str, query: Option<&str>) -> Option<Url> {
        let segments = decode_segments(path)?;
        let (base, forwarded) = match self.routes.get(app_key) {
            Some(base) => (base, segments.get(1..).unwrap_or_default()),
            None => (self.default_upstream.as_ref()?, &segments[..]),
        };

        let mut target = base.clone();
        if !forwarded.is_empty() {
            target
                .path_segments_mut()
                .ok()?
                .pop_if_empty()
                .extend(forwarded);
        }
        target.set_query(query.filter(|q| !q.is_empty()));

        let prefix = base.path().trim_end_matches('/');
        let contained = prefix.is_empty()
            || target.path() == prefix
            || target.path().starts_with(&format!("{}/", prefix));
        contained.then_some(target)
    }

    /// Forward one request and relay the upstream response.
    pub async fn forward(
        &self,
        app_key: &str,
        ctx: &AuthContext,
        request: Request<Body>,
    ) -> Result<Response> {
        let url = self
            .upstream_url(app_key, request.uri().path(), request.uri().query())
            .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;

        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| AppError::BadRequest("Request body too large or unreadable".to_string()))?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::AUTHORIZATION);
        strip_token_cookie(&mut headers);
        headers.remove(&self.identity_header);

        let identity = serde_json::to_string(&ctx.identity())
            .map_err(|e| AppError::Internal(e.into()))?;
        let identity = HeaderValue::from_str(&identity)
            .map_err(|e| AppError::Internal(e.into()))?;
        headers.insert(self.identity_header.clone(), identity);

        let method = parts.method;
        let start = Instant::now();
        let result = self
            .client
            .request(method.clone(), url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await;

        let upstream = match result {
            Ok(upstream) => upstream,
            Err(e) => {
                counter!("authx_gateway_forward_total", "outcome" => "upstream_error").increment(1);
                tracing::warn!(app_key = %app_key, url = %url, error = %e, "Upstream request failed");
                return Err(AppError::UpstreamUnavailable(e.to_string()));
            }
        };

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        let bytes = upstream.bytes().await.map_err(|e| {
            counter!("authx_gateway_forward_total", "outcome" => "upstream_error").increment(1);
            AppError::UpstreamUnavailable(e.to_string())
        })?;

        histogram!("authx_gateway_forward_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        counter!("authx_gateway_forward_total", "outcome" => "forwarded").increment(1);
        tracing::debug!(
            app_key = %app_key,
            method = %method,
            status = status.as_u16(),
            "Forwarded request"
        );

        strip_hop_by_hop(&mut response_headers);
        response_headers.remove(header::CONTENT_LENGTH);

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

fn parse_upstream(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("Invalid upstream URL '{}': {}", raw, e))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Internal(anyhow::anyhow!(
            "Upstream URL '{}' must use http or https",
            raw
        )));
    }
    Ok(url)
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in named.iter().map(String::as_str).chain(HOP_BY_HOP.iter().copied()) {
        headers.remove(name);
    }
}

/// Drop the session cookie from `Cookie`, keeping every other cookie.
fn strip_token_cookie(headers: &mut HeaderMap) {
    let kept: Vec<String> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next().map(str::trim) != Some(TOKEN_COOKIE))
        .map(str::to_string)
        .collect();

    headers.remove(header::COOKIE);
    if kept.is_empty() {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&kept.join("; ")) {
        headers.insert(header::COOKIE, value);
    }
}
