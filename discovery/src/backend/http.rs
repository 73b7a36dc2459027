use super::{
    BackendError, CategoryDirectory, ContentSource, EventSource, PlaceDirectory, RegionLookup,
};
use crate::config::BackendConfig;
use crate::filter::EventQuery;
use crate::metrics_defs::{BACKEND_REQUEST_DURATION, BACKEND_RETRY};
use crate::types::{
    CategoryRecord, EventDetail, EventsPage, NewsDetail, PlaceDetail, PlaceRecord,
};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{Duration, sleep};
use tracing::{debug, warn};

const RETRIABLE_STATUS_CODES: &[StatusCode] = &[
    StatusCode::TOO_MANY_REQUESTS,     // 429
    StatusCode::INTERNAL_SERVER_ERROR, // 500
    StatusCode::BAD_GATEWAY,           // 502
    StatusCode::SERVICE_UNAVAILABLE,   // 503
    StatusCode::GATEWAY_TIMEOUT,       // 504
];

/// Client for the event-data REST API.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        if config.url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(config.url.to_string()));
        }

        Ok(HttpBackend {
            client,
            base_url: config.url.clone(),
            max_retries: config.max_retries,
            base_delay: config.base_delay(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GETs `url` and decodes the JSON body. A 404 is `Ok(None)`; retriable
    /// statuses are retried with exponential backoff; anything else fails.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: Url,
    ) -> Result<Option<T>, BackendError> {
        let mut retries = 0;

        loop {
            let start = Instant::now();
            let response = self.client.get(url.clone()).send().await;
            histogram!(BACKEND_REQUEST_DURATION, "endpoint" => endpoint)
                .record(start.elapsed().as_secs_f64());
            let response = response?;

            let status = response.status();
            if status.is_success() {
                return Ok(Some(response.json::<T>().await?));
            }

            if status == StatusCode::NOT_FOUND {
                debug!(endpoint, %url, "backend returned not found");
                return Ok(None);
            }

            if !RETRIABLE_STATUS_CODES.contains(&status) {
                return Err(BackendError::UnexpectedStatus {
                    endpoint,
                    status: status.as_u16(),
                });
            }

            if retries >= self.max_retries {
                return Err(BackendError::RetriesExceeded { endpoint, retries });
            }

            // Backoff between retries
            let delay = self.base_delay.saturating_mul(2_u32.saturating_pow(retries));
            warn!(endpoint, status = status.as_u16(), ?delay, "retrying backend request");
            counter!(BACKEND_RETRY, "endpoint" => endpoint).increment(1);
            sleep(delay).await;
            retries += 1;
        }
    }

    /// Like `get_json` for endpoints where a 404 is itself an error.
    async fn get_required<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: Url,
    ) -> Result<T, BackendError> {
        self.get_json(endpoint, url)
            .await?
            .ok_or(BackendError::UnexpectedStatus {
                endpoint,
                status: StatusCode::NOT_FOUND.as_u16(),
            })
    }
}

#[async_trait]
impl EventSource for HttpBackend {
    async fn query_events(&self, query: &EventQuery) -> Result<EventsPage, BackendError> {
        let mut url = self.endpoint(&["events"])?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        self.get_required("events", url).await
    }
}

#[async_trait]
impl RegionLookup for HttpBackend {
    async fn containing_region(&self, place_slug: &str) -> Result<Option<String>, BackendError> {
        let url = self.endpoint(&["places", place_slug])?;
        let detail: Option<PlaceDetail> = self.get_json("place", url).await?;
        Ok(detail.and_then(|d| d.region).map(|region| region.slug))
    }
}

#[async_trait]
impl PlaceDirectory for HttpBackend {
    async fn list_places(&self) -> Result<Arc<[PlaceRecord]>, BackendError> {
        let url = self.endpoint(&["places"])?;
        let places: Vec<PlaceRecord> = self.get_required("places", url).await?;
        debug!(count = places.len(), "fetched place list");
        Ok(places.into())
    }
}

#[async_trait]
impl CategoryDirectory for HttpBackend {
    async fn list_categories(&self) -> Result<Arc<[CategoryRecord]>, BackendError> {
        let url = self.endpoint(&["categories"])?;
        let categories: Vec<CategoryRecord> = self.get_required("categories", url).await?;
        Ok(categories.into())
    }
}

#[async_trait]
impl ContentSource for HttpBackend {
    async fn event_detail(&self, slug: &str) -> Result<Option<EventDetail>, BackendError> {
        let url = self.endpoint(&["events", slug])?;
        self.get_json("event", url).await
    }

    async fn news_detail(&self, slug: &str) -> Result<Option<NewsDetail>, BackendError> {
        let url = self.endpoint(&["news", slug])?;
        self.get_json("news", url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DateFilter;
    use axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::StatusCode as AxumStatus,
        response::IntoResponse,
        routing::get,
    };
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct ServerState {
        events_calls: AtomicUsize,
        // Number of 503s to return before succeeding. usize::MAX never recovers.
        events_failures: usize,
        events_status: Option<u16>,
    }

    async fn events(
        State(state): State<Arc<ServerState>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> axum::response::Response {
        let call = state.events_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = state.events_status {
            return AxumStatus::from_u16(status).unwrap().into_response();
        }
        if call < state.events_failures {
            return AxumStatus::SERVICE_UNAVAILABLE.into_response();
        }

        // Echo the filters back in the title so tests can check the query string.
        let title = format!(
            "{}|{}|{}",
            params.get("place").map(String::as_str).unwrap_or("-"),
            params.get("byDate").map(String::as_str).unwrap_or("-"),
            params.get("size").map(String::as_str).unwrap_or("-"),
        );
        Json(serde_json::json!({
            "content": [{"id": "1", "slug": "e1", "title": title, "startDate": "2026-10-19"}],
            "currentPage": 0, "pageSize": 10, "totalElements": 1, "totalPages": 1, "last": true
        }))
        .into_response()
    }

    async fn places() -> Json<serde_json::Value> {
        Json(serde_json::json!([
            {"id": 1, "type": "CITY", "name": "Mataró", "slug": "mataro"},
            {"id": 2, "type": "REGION", "name": "Maresme", "slug": "maresme"}
        ]))
    }

    async fn place(Path(slug): Path<String>) -> axum::response::Response {
        match slug.as_str() {
            "mataro" => Json(serde_json::json!({
                "id": 1, "type": "CITY", "name": "Mataró", "slug": "mataro",
                "region": {"slug": "maresme", "name": "Maresme"}
            }))
            .into_response(),
            "maresme" => Json(serde_json::json!({
                "id": 2, "type": "REGION", "name": "Maresme", "slug": "maresme"
            }))
            .into_response(),
            _ => AxumStatus::NOT_FOUND.into_response(),
        }
    }

    async fn event(Path(slug): Path<String>) -> axum::response::Response {
        if slug == "concert" {
            Json(serde_json::json!({"slug": "concert", "title": "Concert"})).into_response()
        } else {
            AxumStatus::NOT_FOUND.into_response()
        }
    }

    async fn spawn_server(state: ServerState) -> (Url, Arc<ServerState>) {
        let state = Arc::new(state);
        let app = Router::new()
            .route("/api/events", get(events))
            .route("/api/events/{slug}", get(event))
            .route("/api/places", get(places))
            .route("/api/places/{slug}", get(place))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (Url::parse(&format!("http://{addr}/api")).unwrap(), state)
    }

    fn backend(url: Url) -> HttpBackend {
        let mut config = BackendConfig::new(url);
        config.base_delay_ms = 1;
        config.max_retries = 2;
        HttpBackend::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_query_events() {
        let (url, state) = spawn_server(ServerState::default()).await;
        let client = backend(url);

        let mut query = EventQuery::unscoped(0, 20).in_place("mataro");
        query.date = Some(DateFilter::CapDeSetmana);
        let page = client.query_events(&query).await.unwrap();

        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].title, "mataro|cap-de-setmana|20");
        assert_eq!(state.events_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let (url, state) = spawn_server(ServerState {
            events_failures: 2,
            ..Default::default()
        })
        .await;
        let client = backend(url);

        let page = client.query_events(&EventQuery::unscoped(0, 10)).await;
        assert!(page.is_ok());
        assert_eq!(state.events_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exceeded() {
        let (url, state) = spawn_server(ServerState {
            events_failures: usize::MAX,
            ..Default::default()
        })
        .await;
        let client = backend(url);

        let result = client.query_events(&EventQuery::unscoped(0, 10)).await;
        assert!(matches!(
            result,
            Err(BackendError::RetriesExceeded {
                endpoint: "events",
                retries: 2
            })
        ));
        assert_eq!(state.events_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retriable_status() {
        let (url, state) = spawn_server(ServerState {
            events_status: Some(400),
            ..Default::default()
        })
        .await;
        let client = backend(url);

        let result = client.query_events(&EventQuery::unscoped(0, 10)).await;
        assert!(matches!(
            result,
            Err(BackendError::UnexpectedStatus {
                endpoint: "events",
                status: 400
            })
        ));
        assert_eq!(state.events_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_places_and_regions() {
        let (url, _state) = spawn_server(ServerState::default()).await;
        let client = backend(url);

        let places = client.list_places().await.unwrap();
        assert_eq!(places.len(), 2);
        assert_eq!(places[1].slug, "maresme");

        assert_eq!(
            client.containing_region("mataro").await.unwrap(),
            Some("maresme".to_string())
        );
        // Regions have no containing region, unknown places are not errors.
        assert_eq!(client.containing_region("maresme").await.unwrap(), None);
        assert_eq!(client.containing_region("xyzzy").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_event_detail() {
        let (url, _state) = spawn_server(ServerState::default()).await;
        let client = backend(url);

        let detail = client.event_detail("concert").await.unwrap().unwrap();
        assert_eq!(detail["title"], "Concert");
        assert_eq!(client.event_detail("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        // Nothing listens on the discard port.
        let client = backend(Url::parse("http://127.0.0.1:9/api").unwrap());
        let result = client.list_places().await;
        assert!(matches!(result, Err(BackendError::ReqwestError(_))));
    }

    #[test]
    fn test_endpoint_urls() {
        let with_slash = backend(Url::parse("https://api.esdeveniments.cat/api/").unwrap());
        assert_eq!(
            with_slash.endpoint(&["places", "sant-adrià"]).unwrap().as_str(),
            "https://api.esdeveniments.cat/api/places/sant-adri%C3%A0"
        );

        let without_slash = backend(Url::parse("https://api.esdeveniments.cat/api").unwrap());
        assert_eq!(
            without_slash.endpoint(&["events"]).unwrap().as_str(),
            "https://api.esdeveniments.cat/api/events"
        );
    }
}
