//! Prometheus metrics for the Lark dumper CLI.
//!
//! Exposes:
//! - `lark_dumper_command_duration_seconds` (histogram)
//! - `lark_dumper_command_total` (counter with status)
//! - `lark_dumper_command_inflight` (gauge)
//! - `lark_dumper_conversations_total` (counter with status)
//! - `lark_dumper_attachments_total` and `lark_dumper_attachment_bytes_total`
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge_vec, Encoder, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec,
    TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static COMMAND_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // 1s up to ~4.5 hours; full exports of large tenants are slow.
    let buckets =
        prometheus::exponential_buckets(1.0, 2.0, 15).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "lark_dumper_command_duration_seconds",
        "CLI command duration in seconds",
        &["command"],
        buckets
    )
    .expect("failed to register command duration histogram")
});

static COMMAND_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "lark_dumper_command_total",
        "Total command executions by status",
        &["command", "status"]
    )
    .expect("failed to register command counter")
});

static COMMAND_INFLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "lark_dumper_command_inflight",
        "Commands currently running",
        &["command"]
    )
    .expect("failed to register inflight gauge")
});

static CONVERSATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "lark_dumper_conversations_total",
        "Conversation exports by status",
        &["status"]
    )
    .expect("failed to register conversation counter")
});

static ATTACHMENTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("lark_dumper_attachments_total", "Attachments downloaded")
        .expect("failed to register attachment counter")
});

static ATTACHMENT_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "lark_dumper_attachment_bytes_total",
        "Attachment bytes written to disk"
    )
    .expect("failed to register attachment bytes counter")
});

fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&COMMAND_DURATION);
    Lazy::force(&COMMAND_TOTAL);
    Lazy::force(&COMMAND_INFLIGHT);
    Lazy::force(&CONVERSATIONS_TOTAL);
    Lazy::force(&ATTACHMENTS_TOTAL);
    Lazy::force(&ATTACHMENT_BYTES);
}

fn status_label(success: bool) -> &'static str {
    if success {
        "ok"
    } else {
        "error"
    }
}

/// Mark a command as started.
pub fn record_command_start(command: &'static str) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).inc();
}

/// Record command completion with duration and status.
pub fn record_command_result(command: &'static str, duration: Duration, success: bool) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).dec();
    COMMAND_DURATION
        .with_label_values(&[command])
        .observe(duration.as_secs_f64());
    COMMAND_TOTAL
        .with_label_values(&[command, status_label(success)])
        .inc();
}

/// Record the outcome of one conversation export.
pub fn record_conversation(success: bool) {
    init_collectors();
    CONVERSATIONS_TOTAL
        .with_label_values(&[status_label(success)])
        .inc();
}

/// Record the attachments saved for one conversation.
pub fn record_attachments(count: usize, bytes: u64) {
    init_collectors();
    ATTACHMENTS_TOTAL.inc_by(count as u64);
    ATTACHMENT_BYTES.inc_by(bytes);
}

fn plain_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(plain_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "encode error",
        ));
    }

    let mut response = plain_response(StatusCode::OK, buffer);
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static(prometheus::TEXT_FORMAT),
    );
    Ok(response)
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => Ok(plain_response(StatusCode::NOT_FOUND, Bytes::new())),
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, service_fn(handle_request))
                .await
            {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}
