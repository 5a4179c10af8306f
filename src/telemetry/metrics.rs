//! Prometheus metrics setup and metric definitions

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    // Seconds; sub-millisecond buckets for the gate and health endpoints.
    let buckets = [
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit initial zero values so Prometheus output
/// includes HELP/TYPE lines for all metrics from startup.
pub fn describe_metrics() {
    // HTTP metrics
    describe_counter!("authx_http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "authx_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "authx_http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    );

    // Identity metrics
    describe_counter!("authx_auth_signup_total", "Signup attempts by result");
    describe_counter!("authx_auth_login_total", "Password login attempts by result");
    describe_counter!(
        "authx_tokens_issued_total",
        "Tokens issued by subject type"
    );

    // Gate and gateway
    describe_counter!(
        "authx_gate_decisions_total",
        "Request gate outcomes (allow/deny/unauthenticated/invalid_token/open)"
    );
    describe_counter!(
        "authx_gateway_forward_total",
        "Gateway forwarding outcomes"
    );
    describe_histogram!(
        "authx_gateway_forward_duration_seconds",
        "Upstream round trip time in seconds"
    );

    counter!("authx_auth_signup_total", "result" => "success").absolute(0);
    counter!("authx_auth_login_total", "result" => "success").absolute(0);
    counter!("authx_auth_login_total", "result" => "failure").absolute(0);
    counter!("authx_tokens_issued_total", "subject_type" => "user").absolute(0);
    counter!("authx_tokens_issued_total", "subject_type" => "client").absolute(0);
    counter!("authx_gate_decisions_total", "outcome" => "allow").absolute(0);
    counter!("authx_gate_decisions_total", "outcome" => "deny").absolute(0);
    counter!("authx_gateway_forward_total", "outcome" => "forwarded").absolute(0);
    counter!("authx_gateway_forward_total", "outcome" => "upstream_error").absolute(0);
    gauge!("authx_http_requests_in_flight").set(0.0);
}
