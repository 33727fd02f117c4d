//! HTTP surface: the signalling socket plus the optional hosting extras
//! (static client files, HTTPS enforcement behind a TLS-terminating proxy).

use std::future::Future;
use std::path::PathBuf;

use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::info;

use super::ws::{self, SignalState};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Directory served for every path other than the signalling socket.
    pub static_dir: Option<PathBuf>,
    /// Redirect requests a reverse proxy received over plain HTTP.
    pub enforce_https: bool,
}

/// Build the full axum application.
pub fn app(state: SignalState, options: &HttpOptions) -> Router {
    let mut router = ws::routes().with_state(state);
    if let Some(dir) = &options.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }
    if options.enforce_https {
        router = router.layer(middleware::from_fn(enforce_https));
    }
    router
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "HTTP listener ready");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// A missing (or empty) `X-Forwarded-Proto` means the request did not come
/// through the proxy and passes untouched.
async fn enforce_https(req: Request, next: Next) -> Response {
    let proto = req
        .headers()
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if proto.is_empty() || proto.eq_ignore_ascii_case("https") {
        return next.run(req).await;
    }

    let Some(host) = req.headers().get(header::HOST).and_then(|v| v.to_str().ok()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let location = format!("https://{host}{path}");
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
