//! Collaborators that talk to the event-data backend.
//!
//! The discovery core only depends on the traits below. `HttpBackend` is the
//! production implementation and `CachedBackend` wraps any implementation with
//! keyed TTL caches.

mod cached;
mod http;

pub use cached::CachedBackend;
pub use http::HttpBackend;

use crate::filter::EventQuery;
use crate::types::{CategoryRecord, EventDetail, EventsPage, NewsDetail, PlaceRecord};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("backend unavailable after {retries} retries ({endpoint})")]
    RetriesExceeded {
        endpoint: &'static str,
        retries: u32,
    },
    #[error("unexpected status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: &'static str, status: u16 },
}

#[async_trait]
pub trait EventSource: Send + Sync {
    /// Queries one page of the event listing. No matching events is an empty
    /// page, not an error.
    async fn query_events(&self, query: &EventQuery) -> Result<EventsPage, BackendError>;
}

#[async_trait]
pub trait RegionLookup: Send + Sync {
    /// Slug of the region containing `place_slug`, if the place is known and
    /// belongs to one.
    async fn containing_region(&self, place_slug: &str) -> Result<Option<String>, BackendError>;
}

#[async_trait]
pub trait PlaceDirectory: Send + Sync {
    async fn list_places(&self) -> Result<Arc<[PlaceRecord]>, BackendError>;
}

#[async_trait]
pub trait CategoryDirectory: Send + Sync {
    async fn list_categories(&self) -> Result<Arc<[CategoryRecord]>, BackendError>;
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn event_detail(&self, slug: &str) -> Result<Option<EventDetail>, BackendError>;
    async fn news_detail(&self, slug: &str) -> Result<Option<NewsDetail>, BackendError>;
}

/// Everything the discovery service needs from the backend.
pub trait Backend:
    EventSource + RegionLookup + PlaceDirectory + CategoryDirectory + ContentSource
{
}

impl<T> Backend for T where
    T: EventSource + RegionLookup + PlaceDirectory + CategoryDirectory + ContentSource
{
}
