//! # Query Server
//!
//! Minimal HTTP endpoint exposing the reading series as JSON.
//!
//! - `GET /data.json` - current [`SeriesSnapshot`](crate::telemetry::series::SeriesSnapshot)
//! - `GET /health` - liveness probe

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::error::Result;
use crate::telemetry::series::Series;

/// Shared state of the query handlers
#[derive(Clone)]
pub struct QueryState {
    series: Arc<dyn Series>,
    clock: Arc<dyn Clock>,
}

impl QueryState {
    /// Serve snapshots of `series`, stamped by `clock`
    pub fn new(series: Arc<dyn Series>, clock: Arc<dyn Clock>) -> Self {
        Self { series, clock }
    }
}

/// Serve queries on `addr` until `shutdown` resolves
///
/// # Errors
///
/// Returns error if the address cannot be bound or the server fails
pub async fn serve<F>(addr: SocketAddr, state: QueryState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let make_service = make_service_fn(move |_conn| {
        let state = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(handle_request(&state, &req)) }
            }))
        }
    });

    let server = Server::try_bind(&addr)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, e))?
        .serve(make_service);
    info!("Serving readings at http://{}/data.json", server.local_addr());

    server
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| {
            error!("Query server error: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e)
        })?;

    Ok(())
}

/// Route a single request
pub fn handle_request(state: &QueryState, req: &Request<Body>) -> Response<Body> {
    debug!("{} {}", req.method(), req.uri().path());

    match (req.method(), req.uri().path()) {
        (&Method::GET, "/data.json") => {
            let snapshot = state.series.snapshot(state.clock.now_millis());
            match serde_json::to_vec(&snapshot) {
                Ok(body) => respond(StatusCode::OK, "application/json", body),
                Err(e) => {
                    error!("Failed to encode snapshot: {}", e);
                    respond(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "text/plain",
                        format!("Failed to encode snapshot: {}", e),
                    )
                }
            }
        }
        (&Method::GET, "/health") => respond(StatusCode::OK, "text/plain", "OK"),
        _ => respond(StatusCode::NOT_FOUND, "text/plain", "Not Found"),
    }
}

fn respond(status: StatusCode, content_type: &'static str, body: impl Into<Body>) -> Response<Body> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::telemetry::series::SeriesStore;

    fn state_with(readings: &[(f64, f64)]) -> QueryState {
        let series = Arc::new(SeriesStore::new());
        for (i, &(pm25, pm10)) in readings.iter().enumerate() {
            series.append("ug/m3 PM2.5=1.0, PM10=2.0", pm25, pm10, i as i64 * 1000);
        }
        let mut clock = MockClock::new();
        clock.expect_now_millis().return_const(1_234_i64);
        QueryState::new(series, Arc::new(clock))
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_data_json() {
        let state = state_with(&[(1.0, 2.0), (3.0, 4.0)]);
        let response = handle_request(&state, &get("/data.json"));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let json = body_json(response).await;
        assert_eq!(json["started"], 1234);
        assert_eq!(json["pm25"], serde_json::json!([1.0, 3.0]));
        assert_eq!(json["pm10"], serde_json::json!([2.0, 4.0]));
        assert_eq!(json["ts"], serde_json::json!([0, 1000]));
        assert_eq!(json["last"], "ug/m3 PM2.5=1.0, PM10=2.0");
    }

    #[tokio::test]
    async fn test_data_json_empty_series() {
        let state = state_with(&[]);
        let json = body_json(handle_request(&state, &get("/data.json"))).await;
        assert_eq!(json["pm25"], serde_json::json!([]));
        assert_eq!(json["last"], "");
    }

    #[tokio::test]
    async fn test_health() {
        let state = state_with(&[]);
        let response = handle_request(&state, &get("/health"));
        assert_eq!(response.status(), StatusCode::OK);
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let state = state_with(&[]);
        assert_eq!(handle_request(&state, &get("/index.html")).status(), StatusCode::NOT_FOUND);

        let post = Request::builder()
            .method(Method::POST)
            .uri("/data.json")
            .body(Body::empty())
            .unwrap();
        assert_eq!(handle_request(&state, &post).status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_shuts_down() {
        let state = state_with(&[]);
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let result = serve(addr, state, async {}).await;
        assert!(result.is_ok());
    }
}
