use crate::backend::Backend;
use crate::config::Listener as ListenerConfig;
use crate::discovery::{BrowseOutcome, Discovery, DiscoveryError, PageResponse};
use crate::filter::split_path;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use http::{HeaderValue, StatusCode, header};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use url::{Position, Url};

/// Mount point of the browse listings.
const LISTING_ROOT: &str = "/events";

#[derive(thiserror::Error, Debug)]
pub enum DiscoveryApiError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub fn router<B: Backend + 'static>(discovery: Arc<Discovery<B>>) -> Router {
    Router::new()
        .route("/events", get(browse_root::<B>))
        .route("/events/{*path}", get(browse::<B>))
        .route("/event/{slug}", get(event_detail::<B>))
        .route("/news/{slug}", get(news_detail::<B>))
        .route("/health", get(health))
        .route("/ready", get(ready::<B>))
        .with_state(discovery)
}

pub async fn serve<B: Backend + 'static>(
    listener: ListenerConfig,
    discovery: Arc<Discovery<B>>,
) -> Result<(), DiscoveryApiError> {
    let app = router(discovery);

    let addr = format!("{}:{}", listener.host, listener.port);
    tracing::info!("Listening on {addr}");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error_message: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Json(ApiErrorResponse {
        error_message: message.into(),
    });
    (status, body).into_response()
}

impl IntoResponse for DiscoveryError {
    fn into_response(self) -> Response {
        let status = match self {
            DiscoveryError::Backend(_) => StatusCode::BAD_GATEWAY,
        };
        tracing::error!(error = %self, "Request failed");
        error_response(status, self.to_string())
    }
}

enum BrowseResponse {
    Redirect(String),
    Page(PageResponse),
}

impl IntoResponse for BrowseResponse {
    fn into_response(self) -> Response {
        match self {
            BrowseResponse::Redirect(location) => match listing_location(&location) {
                Some(value) => (StatusCode::PERMANENT_REDIRECT, [(header::LOCATION, value)])
                    .into_response(),
                None => error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("cannot redirect to {location}"),
                ),
            },
            BrowseResponse::Page(page) => (StatusCode::OK, Json(page)).into_response(),
        }
    }
}

impl From<BrowseOutcome> for BrowseResponse {
    fn from(outcome: BrowseOutcome) -> Self {
        match outcome {
            BrowseOutcome::Redirect { location, .. } => BrowseResponse::Redirect(location),
            BrowseOutcome::Render(page) => BrowseResponse::Page(page),
        }
    }
}

/// Percent-encodes a canonical listing URL and prefixes it with the mount
/// point, so it can be sent as a `Location` header.
fn listing_location(location: &str) -> Option<HeaderValue> {
    let base = Url::parse("http://localhost/").ok()?;
    let url = base.join(&format!("{LISTING_ROOT}{location}")).ok()?;
    HeaderValue::from_str(&url[Position::BeforePath..]).ok()
}

async fn browse_root<B: Backend + 'static>(
    State(discovery): State<Arc<Discovery<B>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<BrowseResponse, DiscoveryError> {
    let segments: [&str; 0] = [];
    Ok(discovery.browse(&segments, &params).await?.into())
}

async fn browse<B: Backend + 'static>(
    State(discovery): State<Arc<Discovery<B>>>,
    Path(path): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<BrowseResponse, DiscoveryError> {
    let segments = split_path(&path);
    Ok(discovery.browse(&segments, &params).await?.into())
}

async fn event_detail<B: Backend + 'static>(
    State(discovery): State<Arc<Discovery<B>>>,
    Path(slug): Path<String>,
) -> Result<Response, DiscoveryError> {
    Ok(match discovery.event_detail(&slug).await? {
        Some(detail) => Json(detail).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("event {slug} not found")),
    })
}

async fn news_detail<B: Backend + 'static>(
    State(discovery): State<Arc<Discovery<B>>>,
    Path(slug): Path<String>,
) -> Result<Response, DiscoveryError> {
    Ok(match discovery.news_detail(&slug).await? {
        Some(detail) => Json(detail).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("news {slug} not found")),
    })
}

async fn health() -> &'static str {
    "ok"
}

async fn ready<B: Backend + 'static>(State(discovery): State<Arc<Discovery<B>>>) -> Response {
    if discovery.is_ready() {
        (StatusCode::OK, "ok").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}
