//! HTTP front end: hands every request to [`App::handle`] on the blocking
//! pool, and serves static assets directly.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response as HttpResponse};
use tower_http::services::ServeDir;

use crate::app::{App, Request, Response};
use crate::forms::FormData;

pub type SharedApp = Arc<App>;

/// Builds the router around an application.
pub fn create_router(app: SharedApp) -> Router {
    let static_dir = app.settings().static_dir.clone();
    Router::new()
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(dispatch)
        .with_state(app)
}

/// Binds the configured address and serves until the process is stopped.
pub async fn serve(app: App) -> Result<()> {
    let addr = app.settings().listen_addr;
    let router = create_router(Arc::new(app));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, router).await.context("Server error")?;
    Ok(())
}

async fn dispatch(
    State(app): State<SharedApp>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResponse {
    let target = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());
    let mut request = Request::new(method, target);
    if request.is_post() {
        request.form = FormData::parse(&body);
    }
    request.headers = headers;

    match tokio::task::spawn_blocking(move || app.handle(request)).await {
        Ok(response) => into_http(response),
        Err(e) => {
            tracing::error!("Request handler panicked: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn into_http(response: Response) -> HttpResponse {
    let Response {
        status,
        headers,
        body,
    } = response;
    (status, headers, body).into_response()
}
