use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::{Middleware, Responder};
use crate::error::Outcome;
use crate::server::Request;

/// Middleware collecting Prometheus-compatible request metrics.
///
/// All counters are atomics updated with relaxed ordering; readers see
/// eventually consistent values without taking a lock.
///
/// Metrics collected:
/// - Total request count
/// - Average latency across the wrapped chain
/// - Count of failed requests (an `Err` outcome or a `5xx` response)
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    server_errors: AtomicUsize,
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of requests seen.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean processing time, zero before the first request.
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Requests that ended in an error outcome or a `5xx` status.
    pub fn server_errors(&self) -> usize {
        self.server_errors.load(Ordering::Relaxed)
    }

    /// Render the counters in Prometheus text exposition format.
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        format!(
            "# HELP trellis_requests_total Total number of handled requests\n\
             # TYPE trellis_requests_total counter\n\
             trellis_requests_total {}\n\
             # HELP trellis_request_latency_seconds Average request latency in seconds\n\
             # TYPE trellis_request_latency_seconds gauge\n\
             trellis_request_latency_seconds {}\n\
             # HELP trellis_request_errors_total Requests that failed or returned 5xx\n\
             # TYPE trellis_request_errors_total counter\n\
             trellis_request_errors_total {}\n",
            self.request_count(),
            self.average_latency().as_secs_f64(),
            self.server_errors(),
        )
    }
}

impl Middleware for MetricsMiddleware {
    fn handle(&self, req: &mut Request, next: &dyn Responder) -> Outcome {
        let start = Instant::now();
        let outcome = next.respond(req);
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
        let failed = match &outcome {
            Ok(res) => res.status.is_server_error(),
            Err(_) => true,
        };
        if failed {
            self.server_errors.fetch_add(1, Ordering::Relaxed);
        }
        outcome
    }

    fn name(&self) -> &'static str {
        "metrics"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Response;
    use http::{Method, StatusCode};

    #[test]
    fn test_counts_requests_and_failures() {
        let metrics = MetricsMiddleware::new();
        let ok = |_req: &mut Request| -> Outcome { Ok(Response::text("ok")) };
        let unavailable =
            |_req: &mut Request| -> Outcome { Ok(Response::empty(StatusCode::SERVICE_UNAVAILABLE)) };
        let broken = |_req: &mut Request| -> Outcome { Err(anyhow::anyhow!("boom").into()) };

        let mut req = Request::try_new(Method::GET, "/").unwrap();
        metrics.handle(&mut req, &ok).unwrap();
        metrics.handle(&mut req, &unavailable).unwrap();
        assert!(metrics.handle(&mut req, &broken).is_err());

        assert_eq!(metrics.request_count(), 3);
        assert_eq!(metrics.server_errors(), 2);
    }

    #[test]
    fn test_prometheus_rendering() {
        let metrics = MetricsMiddleware::new();
        let text = metrics.render_prometheus();
        assert!(text.contains("# TYPE trellis_requests_total counter"));
        assert!(text.contains("trellis_requests_total 0\n"));
        assert!(text.contains("trellis_request_errors_total 0\n"));
    }
}
