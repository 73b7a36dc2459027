// Short-lived memory of place slugs that are neither canonical nor an alias of one,
// so repeated requests for the same bogus slug skip alias resolution.
use crate::metrics_defs::{UNKNOWN_SLUG_CACHE_HIT, UNKNOWN_SLUG_CACHE_MISS};
use moka::sync::Cache;
use shared::counter;
use std::time::Duration;

const SIZE: u64 = 1000;

pub struct UnknownSlugCache {
    cache: Cache<String, ()>,
}

impl UnknownSlugCache {
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(SIZE)
            .time_to_live(ttl)
            .build();

        UnknownSlugCache { cache }
    }

    pub fn insert(&self, slug: &str) {
        self.cache.insert(slug.to_string(), ());
    }

    pub fn contains(&self, slug: &str) -> bool {
        let cache_hit = self.cache.contains_key(slug);
        let metric_def = if cache_hit {
            UNKNOWN_SLUG_CACHE_HIT
        } else {
            UNKNOWN_SLUG_CACHE_MISS
        };
        counter!(metric_def).increment(1);
        cache_hit
    }
}
