use crate::alias::AliasIndex;
use crate::backend::{
    Backend, BackendError, CachedBackend, CategoryDirectory, ContentSource, PlaceDirectory,
};
use crate::cascade::{CascadeOptions, Tier, run_cascade};
use crate::config::CacheConfig;
use crate::filter::{CanonicalFilter, resolve_route};
use crate::metrics_defs::{ALIAS_REDIRECT, CANONICAL_REDIRECT};
use crate::negative_cache::UnknownSlugCache;
use crate::types::{EventDetail, EventSummary, NewsDetail};
use serde::Serialize;
use shared::counter;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

#[derive(thiserror::Error, Debug)]
pub enum DiscoveryError {
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedirectReason {
    /// The place slug is a variant of a canonical place slug.
    Alias,
    /// Segments were dropped, reordered or not in canonical case.
    NonCanonical,
}

/// A listing ready to be rendered.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub filter: CanonicalFilter,
    pub canonical_url: String,
    pub events: Vec<EventSummary>,
    pub no_events_found: bool,
    pub server_has_more: bool,
    pub total_elements: u64,
    pub tier: Option<Tier>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BrowseOutcome {
    Redirect {
        /// Canonical path and query string, relative to the listing root.
        location: String,
        reason: RedirectReason,
    },
    Render(PageResponse),
}

/// Browse-page orchestration: filter resolution, place aliases, canonical
/// redirects and the fallback cascade.
pub struct Discovery<B> {
    backend: CachedBackend<B>,
    unknown_slugs: UnknownSlugCache,
    cascade: CascadeOptions,
}

impl<B: Backend> Discovery<B> {
    pub fn new(backend: B, cache: &CacheConfig, cascade: CascadeOptions) -> Self {
        Discovery {
            backend: CachedBackend::new(backend, cache),
            unknown_slugs: UnknownSlugCache::new(cache.unknown_slug_ttl()),
            cascade,
        }
    }

    pub fn backend(&self) -> &CachedBackend<B> {
        &self.backend
    }

    /// True once the place list has been loaded at least once.
    pub fn is_ready(&self) -> bool {
        self.backend.is_ready()
    }

    /// Loads the place and category lists into the caches.
    pub async fn warm_up(&self) -> Result<(), DiscoveryError> {
        let places = self.backend.list_places().await?;
        let categories = self.backend.list_categories().await?;
        info!(
            places = places.len(),
            categories = categories.len(),
            "Directory caches warmed up"
        );
        Ok(())
    }

    pub async fn browse<S: AsRef<str>>(
        &self,
        segments: &[S],
        query: &HashMap<String, String>,
    ) -> Result<BrowseOutcome, DiscoveryError> {
        let categories = self.backend.list_categories().await?;
        let known_categories: HashSet<String> =
            categories.iter().map(|c| c.slug.clone()).collect();

        let resolution = resolve_route(segments, query, &known_categories);
        let filter = resolution.filter.clone();

        if filter.has_place() && !self.unknown_slugs.contains(&filter.place) {
            let places = self.backend.list_places().await?;
            let index = AliasIndex::new(&places);
            if !index.is_canonical(&filter.place) {
                match index.resolve(&filter.place).map(str::to_string) {
                    Some(canonical) => {
                        counter!(ALIAS_REDIRECT).increment(1);
                        debug!(from = %filter.place, to = %canonical, "Place alias redirect");
                        let aliased = CanonicalFilter {
                            place: canonical,
                            ..filter
                        };
                        return Ok(BrowseOutcome::Redirect {
                            location: aliased.to_url(),
                            reason: RedirectReason::Alias,
                        });
                    }
                    None => {
                        debug!(place = %filter.place, "Unknown place slug");
                        self.unknown_slugs.insert(&filter.place);
                    }
                }
            }
        }

        if !resolution.is_canonical_path(segments) {
            counter!(CANONICAL_REDIRECT).increment(1);
            if !resolution.dropped.is_empty() {
                debug!(dropped = ?resolution.dropped, "Dropped path segments");
            }
            return Ok(BrowseOutcome::Redirect {
                location: filter.to_url(),
                reason: RedirectReason::NonCanonical,
            });
        }

        let outcome = run_cascade(&filter, &self.backend, &self.backend, self.cascade).await?;
        if outcome.no_events_found {
            debug!(url = %filter.to_url(), "No events found in any tier");
        }

        Ok(BrowseOutcome::Render(PageResponse {
            canonical_url: filter.to_url(),
            filter,
            events: outcome.events,
            no_events_found: outcome.no_events_found,
            server_has_more: outcome.server_has_more,
            total_elements: outcome.total_elements,
            tier: outcome.tier,
        }))
    }

    pub async fn event_detail(&self, slug: &str) -> Result<Option<EventDetail>, DiscoveryError> {
        Ok(self.backend.event_detail(slug).await?)
    }

    pub async fn news_detail(&self, slug: &str) -> Result<Option<NewsDetail>, DiscoveryError> {
        Ok(self.backend.news_detail(slug).await?)
    }
}
