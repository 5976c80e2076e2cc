use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use http::StatusCode;
use serde_json::json;

use crate::dispatcher::{Application, ApplicationBuilder};
use crate::echo::echo_handler;
use crate::error::{Error, RouteError};
use crate::middleware::{Constraint, Middleware, MetricsMiddleware};
use crate::router::Route;
use crate::runtime_config::AppConfig;
use crate::server::{Response, TEXT_PLAIN};

const INDEX_HTML: &str = "<!doctype html>\n<html>\n<head><title>trellis</title></head>\n<body>\n\
<h1>trellis</h1>\n<ul>\n\
<li><a href=\"/echo/hello?x=1\">/echo/:value</a></li>\n\
<li><a href=\"/users/42\">/users/:id&lt;int&gt;</a></li>\n\
<li><a href=\"/session\">/session</a></li>\n\
<li><a href=\"/ticks\">/ticks</a></li>\n\
<li><a href=\"/metrics\">/metrics</a></li>\n\
</ul>\n</body>\n</html>\n";

/// Build the application served by `trellis serve`.
///
/// Returns the metrics middleware alongside so callers can inspect counters.
pub fn demo_application(
    config: AppConfig,
) -> Result<(Application, Arc<MetricsMiddleware>), RouteError> {
    let metrics = Arc::new(MetricsMiddleware::new());
    let exporter = Arc::clone(&metrics);

    let pet_schema = Constraint::json_schema(&json!({
        "type": "object",
        "required": ["name"],
        "properties": {
            "name": { "type": "string", "minLength": 1 },
            "age": { "type": "integer", "minimum": 0 }
        }
    }))?;

    let app = ApplicationBuilder::new(config)
        .shared_middleware(Arc::clone(&metrics) as Arc<dyn Middleware>)
        .route(Route::get("/", |_req| Ok(Response::html(INDEX_HTML))))
        .route(Route::get("/health", |_req| {
            Ok(Response::json(&json!({ "status": "ok" })))
        }))
        .route(Route::get("/echo/:value", echo_handler))
        .route(Route::post("/echo/:value", echo_handler))
        .route(Route::get("/users/:id<int>", |req| {
            let id: i64 = req
                .parameter("id")
                .and_then(|v| v.parse().ok())
                .ok_or_else(Error::not_found)?;
            Ok(Response::json(&json!({ "id": id, "name": format!("user-{id}") })))
        }))
        .route(
            Route::post("/pets", |req| {
                let pet = req.json().cloned().unwrap_or_default();
                Ok(Response::json(&pet).with_status(StatusCode::CREATED))
            })
            .constraint(Constraint::body())
            .constraint(pet_schema),
        )
        .route(Route::get("/session", |req| {
            let session = req.session_mut()?;
            let visits = session
                .get("visits")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0)
                + 1;
            session.set("visits", visits.to_string());
            Ok(Response::json(&json!({ "visits": visits })))
        }))
        .route(Route::post("/logout", |req| {
            req.session_mut()?.destroy();
            Ok(Response::empty(StatusCode::NO_CONTENT))
        }))
        .route(Route::get("/ticks", |req| {
            let count = req
                .query("count")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(5)
                .min(100);
            Ok(Response::stream(TEXT_PLAIN, move |out| {
                for i in 1..=count {
                    writeln!(out, "tick {i}")?;
                    out.flush()?;
                    thread::sleep(Duration::from_millis(100));
                }
                Ok(())
            }))
        }))
        .route(Route::get("/metrics", move |_req| {
            Ok(Response::text(exporter.render_prometheus()))
        }))
        .build()?;

    Ok((app, metrics))
}
