use super::{
    BackendError, CategoryDirectory, ContentSource, EventSource, PlaceDirectory, RegionLookup,
};
use crate::cache::KeyedCache;
use crate::config::CacheConfig;
use crate::filter::EventQuery;
use crate::types::{CategoryRecord, EventDetail, EventsPage, NewsDetail, PlaceRecord};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Wraps a backend with one keyed cache per lookup. Event listings are not
/// cached: they depend on the full filter and go stale quickly.
pub struct CachedBackend<B> {
    inner: B,
    places: KeyedCache<(), Arc<[PlaceRecord]>>,
    categories: KeyedCache<(), Arc<[CategoryRecord]>>,
    regions: KeyedCache<String, Option<String>>,
    events: KeyedCache<String, Option<EventDetail>>,
    news: KeyedCache<String, Option<NewsDetail>>,
    // Set once the place list has been loaded; used by the readiness probe.
    places_loaded: AtomicBool,
}

impl<B> CachedBackend<B> {
    pub fn new(inner: B, config: &CacheConfig) -> Self {
        CachedBackend {
            inner,
            places: KeyedCache::new("places", config.places_ttl()),
            categories: KeyedCache::new("categories", config.places_ttl()),
            regions: KeyedCache::new("regions", config.places_ttl()),
            events: KeyedCache::new("event_detail", config.detail_ttl()),
            news: KeyedCache::new("news_detail", config.detail_ttl()),
            places_loaded: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn is_ready(&self) -> bool {
        self.places_loaded.load(Ordering::Relaxed)
    }

    /// Drops every cached value.
    pub fn clear(&self) {
        self.places.clear();
        self.categories.clear();
        self.regions.clear();
        self.events.clear();
        self.news.clear();
    }
}

#[async_trait]
impl<B: EventSource> EventSource for CachedBackend<B> {
    async fn query_events(&self, query: &EventQuery) -> Result<EventsPage, BackendError> {
        self.inner.query_events(query).await
    }
}

#[async_trait]
impl<B: RegionLookup> RegionLookup for CachedBackend<B> {
    async fn containing_region(&self, place_slug: &str) -> Result<Option<String>, BackendError> {
        self.regions
            .get(&place_slug.to_string(), |_| {
                self.inner.containing_region(place_slug)
            })
            .await
    }
}

#[async_trait]
impl<B: PlaceDirectory> PlaceDirectory for CachedBackend<B> {
    async fn list_places(&self) -> Result<Arc<[PlaceRecord]>, BackendError> {
        let places = self.places.get(&(), |_| self.inner.list_places()).await?;
        self.places_loaded.store(true, Ordering::Relaxed);
        Ok(places)
    }
}

#[async_trait]
impl<B: CategoryDirectory> CategoryDirectory for CachedBackend<B> {
    async fn list_categories(&self) -> Result<Arc<[CategoryRecord]>, BackendError> {
        self.categories
            .get(&(), |_| self.inner.list_categories())
            .await
    }
}

#[async_trait]
impl<B: ContentSource> ContentSource for CachedBackend<B> {
    async fn event_detail(&self, slug: &str) -> Result<Option<EventDetail>, BackendError> {
        self.events
            .get(&slug.to_string(), |_| self.inner.event_detail(slug))
            .await
    }

    async fn news_detail(&self, slug: &str) -> Result<Option<NewsDetail>, BackendError> {
        self.news
            .get(&slug.to_string(), |_| self.inner.news_detail(slug))
            .await
    }
}
