//! Prometheus exposition format and HTTP endpoint.
//!
//! Serves three routes:
//!
//! - the metrics path (default `/metrics`): one registry collect per request,
//!   rendered in the text exposition format
//! - `/`: a landing page linking to the metrics path
//! - `/health` and `/healthz`: liveness probe
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use postfix_exporter::prometheus::serve;
//! use postfix_exporter::Registry;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let registry = Arc::new(Registry::new());
//!     let listener = TcpListener::bind("127.0.0.1:9154").await?;
//!
//!     serve(listener, registry, "/metrics".to_string(), std::future::pending()).await
//! }
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use postfix_types::Sample;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use crate::registry::Registry;

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Pause after a failed accept. Errors such as descriptor exhaustion
/// persist until connections close, so retrying at once would spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections on `listener` until `shutdown` resolves.
///
/// Each connection is served on its own task. Accept errors are logged and
/// retried after [`ACCEPT_ERROR_BACKOFF`].
pub async fn serve<F>(
    listener: TcpListener,
    registry: Arc<Registry>,
    metrics_path: String,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    accept_loop(|| listener.accept(), registry, metrics_path, shutdown).await
}

async fn accept_loop<A, Fut, F>(
    mut accept: A,
    registry: Arc<Registry>,
    metrics_path: String,
    shutdown: F,
) -> std::io::Result<()>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<(TcpStream, SocketAddr)>>,
    F: Future<Output = ()>,
{
    let metrics_path: Arc<str> = metrics_path.into();
    tokio::pin!(shutdown);

    loop {
        let accepted = tokio::select! {
            accepted = accept() => accepted,
            _ = &mut shutdown => return Ok(()),
        };
        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                tokio::select! {
                    _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => continue,
                    _ = &mut shutdown => return Ok(()),
                }
            }
        };
        let io = TokioIo::new(stream);

        let registry = registry.clone();
        let metrics_path = metrics_path.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let registry = registry.clone();
                let metrics_path = metrics_path.clone();
                let method = req.method().clone();
                let path = req.uri().path().to_string();

                async move {
                    Ok::<_, Infallible>(route(&method, &path, &metrics_path, &registry).await)
                }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!(%peer, error = %e, "connection error");
            }
        });
    }
}

/// Produce the response for `path`.
pub async fn route(
    method: &Method,
    path: &str,
    metrics_path: &str,
    registry: &Registry,
) -> Response<Full<Bytes>> {
    if method != Method::GET && method != Method::HEAD {
        return text_response(StatusCode::METHOD_NOT_ALLOWED, "text/plain", "Method Not Allowed");
    }

    if path == metrics_path {
        let body = registry.gather().await;
        text_response(StatusCode::OK, EXPOSITION_CONTENT_TYPE, body)
    } else if path == "/" {
        text_response(
            StatusCode::OK,
            "text/html; charset=utf-8",
            landing_page(metrics_path),
        )
    } else if path == "/health" || path == "/healthz" {
        text_response(StatusCode::OK, "text/plain", "OK")
    } else {
        text_response(StatusCode::NOT_FOUND, "text/plain", "Not Found")
    }
}

fn text_response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn landing_page(metrics_path: &str) -> String {
    let href = escape_html(metrics_path);
    format!(
        "<html>\n\
         <head><title>Postfix exporter</title></head>\n\
         <body>\n\
         <h1>Postfix exporter</h1>\n\
         <p><a href='{}'>Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        href
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&#39;")
        .replace('"', "&quot;")
}

/// Format samples as Prometheus exposition format.
///
/// Every sample is a gauge and gets its own HELP and TYPE lines.
pub fn format_prometheus(samples: &[Sample]) -> String {
    let mut output = String::new();

    for sample in samples {
        output.push_str(&format!(
            "# HELP {} {}\n",
            sample.name,
            escape_help(&sample.help)
        ));
        output.push_str(&format!("# TYPE {} gauge\n", sample.name));
        output.push_str(&format!("{} {}\n", sample.name, format_value(sample.value)));
    }

    output
}

/// Escape HELP text. Backslash and newline must be escaped.
fn escape_help(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::PostfixCollector;
    use crate::engine::ScrapeEngine;
    use crate::testing::StubQueues;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn sample(name: &str, help: &str, value: f64) -> Sample {
        Sample {
            name: name.to_string(),
            help: help.to_string(),
            value,
        }
    }

    fn registry() -> (Arc<Registry>, Arc<StubQueues>) {
        let queues = Arc::new(StubQueues::uniform("12", "2"));
        let registry = Arc::new(Registry::new());
        registry
            .register(Arc::new(PostfixCollector::new(ScrapeEngine::new(
                queues.clone(),
                None,
            ))))
            .unwrap();
        (registry, queues)
    }

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_format_prometheus_basic() {
        let output = format_prometheus(&[sample(
            "postfix_total_queue_length",
            "length of mail queue",
            12.0,
        )]);

        assert_eq!(
            output,
            "# HELP postfix_total_queue_length length of mail queue\n\
             # TYPE postfix_total_queue_length gauge\n\
             postfix_total_queue_length 12\n"
        );
    }

    #[test]
    fn test_format_values() {
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(614400.0), "614400");
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
    }

    #[test]
    fn test_escape_help() {
        assert_eq!(escape_help("simple"), "simple");
        assert_eq!(escape_help("with\\backslash"), "with\\\\backslash");
        assert_eq!(escape_help("with\nnewline"), "with\\nnewline");
    }

    #[test]
    fn test_landing_page_links_metrics_path() {
        let page = landing_page("/custom-metrics");
        assert!(page.contains("<a href='/custom-metrics'>Metrics</a>"));
        assert!(page.contains("<title>Postfix exporter</title>"));
    }

    #[test]
    fn test_landing_page_escapes_path() {
        let page = landing_page("/m'><script>");
        assert!(!page.contains("<script>"));
    }

    #[tokio::test]
    async fn test_route_metrics() {
        let (registry, queues) = registry();

        let response = route(&Method::GET, "/metrics", "/metrics", &registry).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            EXPOSITION_CONTENT_TYPE
        );

        let body = body_string(response).await;
        assert!(body.contains("# TYPE postfix_total_queue_length gauge\n"));
        assert!(body.contains("postfix_total_queue_length 12\n"));
        assert!(body.contains("postfix_bounce_queue_length 2\n"));
        // Exactly one refresh per request
        assert_eq!(queues.calls(), 8);
    }

    #[tokio::test]
    async fn test_route_custom_metrics_path() {
        let (registry, _) = registry();

        let response = route(&Method::GET, "/stats", "/stats", &registry).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = route(&Method::GET, "/metrics", "/stats", &registry).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn landing_and_health_do_not_scrape() {
        let (registry, queues) = registry();

        let landing = route(&Method::GET, "/", "/metrics", &registry).await;
        assert_eq!(landing.status(), StatusCode::OK);
        assert!(body_string(landing).await.contains("href='/metrics'"));

        let health = route(&Method::GET, "/healthz", "/metrics", &registry).await;
        assert_eq!(body_string(health).await, "OK");

        assert_eq!(queues.calls(), 0);
    }

    #[tokio::test]
    async fn test_route_rejects_post() {
        let (registry, queues) = registry();

        let response = route(&Method::POST, "/metrics", "/metrics", &registry).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(queues.calls(), 0);
    }

    // EMFILE, as when the process is out of descriptors
    async fn out_of_descriptors() -> std::io::Result<(TcpStream, SocketAddr)> {
        Err(std::io::Error::from_raw_os_error(24))
    }

    #[tokio::test(start_paused = true)]
    async fn accept_errors_back_off() {
        let (registry, _) = registry();
        let attempts = AtomicUsize::new(0);

        let accept = || {
            attempts.fetch_add(1, Ordering::SeqCst);
            out_of_descriptors()
        };
        accept_loop(
            accept,
            registry,
            "/metrics".to_string(),
            tokio::time::sleep(Duration::from_secs(1)),
        )
        .await
        .unwrap();

        let attempts = attempts.load(Ordering::SeqCst);
        assert!((2..=11).contains(&attempts), "attempts: {}", attempts);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_backoff() {
        let (registry, _) = registry();
        let started = tokio::time::Instant::now();

        accept_loop(
            out_of_descriptors,
            registry,
            "/metrics".to_string(),
            tokio::time::sleep(Duration::from_millis(30)),
        )
        .await
        .unwrap();

        assert!(started.elapsed() < ACCEPT_ERROR_BACKOFF);
    }

    #[tokio::test]
    async fn test_serve_over_tcp() {
        let (registry, _) = registry();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(serve(listener, registry, "/metrics".to_string(), async {
            let _ = stop_rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("postfix_total_queue_length 12"));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
