//! Metrics definitions for the discovery service.

use shared::metrics_defs::{MetricDef, MetricType};

pub const CACHE_HIT: MetricDef = MetricDef {
    name: "cache.hit",
    metric_type: MetricType::Counter,
    description: "Number of keyed cache lookups served from memory, tagged by cache",
};

pub const CACHE_MISS: MetricDef = MetricDef {
    name: "cache.miss",
    metric_type: MetricType::Counter,
    description: "Number of keyed cache lookups that had to compute the value, tagged by cache",
};

pub const CACHE_POPULATE_ERROR: MetricDef = MetricDef {
    name: "cache.populate_error",
    metric_type: MetricType::Counter,
    description: "Number of keyed cache computations that failed, tagged by cache",
};

pub const CACHE_ENTRIES: MetricDef = MetricDef {
    name: "cache.entries",
    metric_type: MetricType::Gauge,
    description: "Entries held by a keyed cache, expired ones included, tagged by cache",
};

pub const UNKNOWN_SLUG_CACHE_HIT: MetricDef = MetricDef {
    name: "unknown_slug_cache.hit",
    metric_type: MetricType::Counter,
    description: "Number of place slugs already known to have no alias",
};

pub const UNKNOWN_SLUG_CACHE_MISS: MetricDef = MetricDef {
    name: "unknown_slug_cache.miss",
    metric_type: MetricType::Counter,
    description: "Number of place slugs not present in the unknown slug cache",
};

pub const CASCADE_TIER: MetricDef = MetricDef {
    name: "cascade.tier",
    metric_type: MetricType::Counter,
    description: "Fallback tier that supplied the returned events, tagged by tier",
};

pub const CASCADE_EXHAUSTED: MetricDef = MetricDef {
    name: "cascade.exhausted",
    metric_type: MetricType::Counter,
    description: "Number of cascades where every tier came back empty",
};

pub const ALIAS_REDIRECT: MetricDef = MetricDef {
    name: "alias.redirect",
    metric_type: MetricType::Counter,
    description: "Number of unknown place slugs redirected to a canonical slug",
};

pub const CANONICAL_REDIRECT: MetricDef = MetricDef {
    name: "filter.canonical_redirect",
    metric_type: MetricType::Counter,
    description: "Number of requests redirected to their canonical URL",
};

pub const BACKEND_REQUEST_DURATION: MetricDef = MetricDef {
    name: "backend.request.duration",
    metric_type: MetricType::Histogram,
    description: "Time to complete a backend API request in seconds, tagged by endpoint",
};

pub const BACKEND_RETRY: MetricDef = MetricDef {
    name: "backend.retry",
    metric_type: MetricType::Counter,
    description: "Number of backend requests retried after a retriable status",
};

pub const ALL_METRICS: &[MetricDef] = &[
    CACHE_HIT,
    CACHE_MISS,
    CACHE_POPULATE_ERROR,
    CACHE_ENTRIES,
    UNKNOWN_SLUG_CACHE_HIT,
    UNKNOWN_SLUG_CACHE_MISS,
    CASCADE_TIER,
    CASCADE_EXHAUSTED,
    ALIAS_REDIRECT,
    CANONICAL_REDIRECT,
    BACKEND_REQUEST_DURATION,
    BACKEND_RETRY,
];
