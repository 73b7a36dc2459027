//! Progressive relaxation of a filter until the backend returns something.
//!
//! Tiers run strictly one after another, each one broader than the last:
//!
//! | tier | query |
//! |---|---|
//! | `full` | the filter as resolved |
//! | `without_category` | category cleared |
//! | `without_date` | date keyword, custom range and category cleared |
//! | `region` | the previous tier scoped to the region containing the place |
//! | `catalunya` | no filters at all |
//!
//! Tiers that would repeat an earlier query are skipped, so a cascade makes at
//! most five backend calls. Results from different tiers are never merged.

use crate::backend::{BackendError, EventSource, RegionLookup};
use crate::filter::{CanonicalFilter, EventQuery};
use crate::metrics_defs::{CASCADE_EXHAUSTED, CASCADE_TIER};
use crate::types::{EventSummary, EventsPage};
use serde::Serialize;
use shared::counter;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Full,
    WithoutCategory,
    WithoutDate,
    Region,
    Catalunya,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Full => "full",
            Tier::WithoutCategory => "without_category",
            Tier::WithoutDate => "without_date",
            Tier::Region => "region",
            Tier::Catalunya => "catalunya",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CascadeOptions {
    /// A tier with at least this many events ends the cascade.
    pub min_results: usize,
}

impl Default for CascadeOptions {
    fn default() -> Self {
        CascadeOptions { min_results: 1 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CascadeOutcome {
    pub events: Vec<EventSummary>,
    /// Every tier came back empty.
    pub no_events_found: bool,
    /// The supplying tier has further pages.
    pub server_has_more: bool,
    /// Tier that supplied `events`, `None` when nothing was found.
    pub tier: Option<Tier>,
    pub total_elements: u64,
}

impl CascadeOutcome {
    fn from_page(tier: Tier, page: EventsPage) -> Self {
        CascadeOutcome {
            no_events_found: false,
            server_has_more: !page.last,
            tier: Some(tier),
            total_elements: page.total_elements,
            events: page.content,
        }
    }

    fn empty() -> Self {
        CascadeOutcome {
            events: Vec::new(),
            no_events_found: true,
            server_has_more: false,
            tier: None,
            total_elements: 0,
        }
    }
}

pub async fn run_cascade<E, R>(
    filter: &CanonicalFilter,
    events: &E,
    regions: &R,
    options: CascadeOptions,
) -> Result<CascadeOutcome, BackendError>
where
    E: EventSource + ?Sized,
    R: RegionLookup + ?Sized,
{
    let full = EventQuery::from(filter);
    let without_category = full.clone().without_category();
    let without_date = without_category.clone().without_date();

    // First non-empty tier, kept in case no tier reaches the threshold.
    let mut fallback: Option<(Tier, EventsPage)> = None;

    for tier in [
        Tier::Full,
        Tier::WithoutCategory,
        Tier::WithoutDate,
        Tier::Region,
        Tier::Catalunya,
    ] {
        let query = match tier {
            Tier::Full => full.clone(),
            Tier::WithoutCategory if filter.has_category() => without_category.clone(),
            Tier::WithoutDate if filter.has_date() => without_date.clone(),
            Tier::Region if filter.has_place() => {
                match regions.containing_region(&filter.place).await? {
                    Some(region) if region != filter.place => {
                        without_date.clone().in_place(region)
                    }
                    _ => continue,
                }
            }
            Tier::Catalunya if !full.is_unscoped() => EventQuery::unscoped(full.page, full.size),
            _ => continue,
        };

        let page = events.query_events(&query).await?;
        let found = page.content.len();
        debug!(tier = tier.as_str(), found, "cascade tier queried");

        if found >= options.min_results {
            counter!(CASCADE_TIER, "tier" => tier.as_str()).increment(1);
            return Ok(CascadeOutcome::from_page(tier, page));
        }
        if found > 0 && fallback.is_none() {
            fallback = Some((tier, page));
        }
    }

    match fallback {
        Some((tier, page)) => {
            counter!(CASCADE_TIER, "tier" => tier.as_str()).increment(1);
            Ok(CascadeOutcome::from_page(tier, page))
        }
        None => {
            counter!(CASCADE_EXHAUSTED).increment(1);
            Ok(CascadeOutcome::empty())
        }
    }
}
