use crate::backend::{
    BackendError, CategoryDirectory, ContentSource, EventSource, PlaceDirectory, RegionLookup,
};
use crate::filter::EventQuery;
use crate::types::{
    CategoryRecord, EventDetail, EventSummary, EventsPage, NewsDetail, PlaceRecord,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

type Listing = Box<dyn Fn(&EventQuery) -> Result<usize, BackendError> + Send + Sync>;

/// In-memory backend that records every call it receives.
///
/// The event listing is driven by a closure returning how many events a
/// query matches; the events themselves are generated.
pub struct MockBackend {
    places: Vec<PlaceRecord>,
    categories: Vec<CategoryRecord>,
    regions: HashMap<String, String>,
    event_details: HashMap<String, EventDetail>,
    news_details: HashMap<String, NewsDetail>,
    listing: Listing,
    fail_places: AtomicBool,
    fail_regions: AtomicBool,
    queries: Mutex<Vec<EventQuery>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MockBackend {
    pub fn new() -> Self {
        MockBackend {
            places: Vec::new(),
            categories: Vec::new(),
            regions: HashMap::new(),
            event_details: HashMap::new(),
            news_details: HashMap::new(),
            listing: Box::new(|_| Ok(0)),
            fail_places: AtomicBool::new(false),
            fail_regions: AtomicBool::new(false),
            queries: Mutex::new(Vec::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_places(mut self, places: Vec<PlaceRecord>) -> Self {
        self.places = places;
        self
    }

    pub fn with_categories(mut self, slugs: &[&str]) -> Self {
        self.categories = slugs
            .iter()
            .enumerate()
            .map(|(i, slug)| CategoryRecord {
                id: i as u64,
                name: slug.to_string(),
                slug: slug.to_string(),
            })
            .collect();
        self
    }

    pub fn with_region(mut self, place: &str, region: &str) -> Self {
        self.regions.insert(place.to_string(), region.to_string());
        self
    }

    pub fn with_event_detail(mut self, slug: &str, detail: EventDetail) -> Self {
        self.event_details.insert(slug.to_string(), detail);
        self
    }

    pub fn with_news_detail(mut self, slug: &str, detail: NewsDetail) -> Self {
        self.news_details.insert(slug.to_string(), detail);
        self
    }

    pub fn with_listing<F>(mut self, listing: F) -> Self
    where
        F: Fn(&EventQuery) -> Result<usize, BackendError> + Send + Sync + 'static,
    {
        self.listing = Box::new(listing);
        self
    }

    pub fn fail_places(&self, fail: bool) {
        self.fail_places.store(fail, Ordering::SeqCst);
    }

    pub fn fail_regions(&self, fail: bool) {
        self.fail_regions.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().get(operation).copied().unwrap_or(0)
    }

    /// Event listing queries in the order they were received.
    pub fn queries(&self) -> Vec<EventQuery> {
        self.queries.lock().clone()
    }

    fn record(&self, operation: &'static str) {
        *self.calls.lock().entry(operation).or_default() += 1;
    }
}

pub fn server_error() -> BackendError {
    BackendError::UnexpectedStatus {
        endpoint: "events",
        status: 500,
    }
}

fn generate_page(query: &EventQuery, count: usize) -> EventsPage {
    let scope = query.place.as_deref().unwrap_or("catalunya");
    let content = (0..count.min(query.size as usize))
        .map(|i| EventSummary {
            id: i.to_string(),
            slug: format!("{scope}-{i}"),
            title: format!("Event {i} in {scope}"),
            start_date: "2025-06-01".to_string(),
            end_date: None,
            location: None,
            town: query.place.clone(),
            region: None,
            image_url: None,
            categories: query.category.iter().cloned().collect(),
        })
        .collect();

    let size = query.size.max(1) as usize;
    let total_pages = count.div_ceil(size) as u32;
    EventsPage {
        content,
        current_page: query.page,
        page_size: query.size,
        total_elements: count as u64,
        total_pages,
        last: query.page + 1 >= total_pages,
    }
}

#[async_trait]
impl EventSource for MockBackend {
    async fn query_events(&self, query: &EventQuery) -> Result<EventsPage, BackendError> {
        self.record("query_events");
        self.queries.lock().push(query.clone());
        let count = (self.listing)(query)?;
        Ok(generate_page(query, count))
    }
}

#[async_trait]
impl RegionLookup for MockBackend {
    async fn containing_region(&self, place_slug: &str) -> Result<Option<String>, BackendError> {
        self.record("containing_region");
        if self.fail_regions.load(Ordering::SeqCst) {
            return Err(BackendError::UnexpectedStatus {
                endpoint: "place",
                status: 503,
            });
        }
        Ok(self.regions.get(place_slug).cloned())
    }
}

#[async_trait]
impl PlaceDirectory for MockBackend {
    async fn list_places(&self) -> Result<Arc<[PlaceRecord]>, BackendError> {
        self.record("list_places");
        if self.fail_places.load(Ordering::SeqCst) {
            return Err(BackendError::RetriesExceeded {
                endpoint: "places",
                retries: 3,
            });
        }
        Ok(self.places.clone().into())
    }
}

#[async_trait]
impl CategoryDirectory for MockBackend {
    async fn list_categories(&self) -> Result<Arc<[CategoryRecord]>, BackendError> {
        self.record("list_categories");
        Ok(self.categories.clone().into())
    }
}

#[async_trait]
impl ContentSource for MockBackend {
    async fn event_detail(&self, slug: &str) -> Result<Option<EventDetail>, BackendError> {
        self.record("event_detail");
        Ok(self.event_details.get(slug).cloned())
    }

    async fn news_detail(&self, slug: &str) -> Result<Option<NewsDetail>, BackendError> {
        self.record("news_detail");
        Ok(self.news_details.get(slug).cloned())
    }
}
