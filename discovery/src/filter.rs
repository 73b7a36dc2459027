//! Resolution of browse URLs into canonical filters.
//!
//! Browse URLs have the shape `/place/date/category` followed by a query
//! string. The second and third segments are positional only in canonical
//! URLs: `/barcelona/musica`, `/barcelona/avui` and `/barcelona/musica/avui`
//! are all accepted, and each segment is classified by its value.
//!
//! Resolution is a total function. Anything that cannot be understood
//! (unknown segments, unparseable or out-of-range query values) is dropped
//! and the filter falls back to its defaults, so a malformed URL degrades to
//! a broader listing instead of an error page.

use crate::types::{CATALUNYA, TOTS};
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use url::form_urlencoded;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;
pub const DEFAULT_RADIUS_KM: f64 = 50.0;
pub const MAX_RADIUS_KM: f64 = 250.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateFilter {
    Avui,
    Dema,
    Setmana,
    CapDeSetmana,
    Tots,
}

impl DateFilter {
    pub const ALL: [DateFilter; 5] = [
        DateFilter::Avui,
        DateFilter::Dema,
        DateFilter::Setmana,
        DateFilter::CapDeSetmana,
        DateFilter::Tots,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            DateFilter::Avui => "avui",
            DateFilter::Dema => "dema",
            DateFilter::Setmana => "setmana",
            DateFilter::CapDeSetmana => "cap-de-setmana",
            DateFilter::Tots => TOTS,
        }
    }

    /// Matches one of the five date keywords exactly.
    pub fn from_keyword(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == segment)
    }

    pub fn is_tots(&self) -> bool {
        *self == DateFilter::Tots
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geo {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalFilter {
    pub place: String,
    pub date: DateFilter,
    pub category: String,
    pub search: Option<String>,
    pub geo: Option<Geo>,
    pub from: Option<Date>,
    pub to: Option<Date>,
    pub page: u32,
    pub size: u32,
}

impl Default for CanonicalFilter {
    fn default() -> Self {
        CanonicalFilter {
            place: CATALUNYA.to_string(),
            date: DateFilter::Tots,
            category: TOTS.to_string(),
            search: None,
            geo: None,
            from: None,
            to: None,
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CanonicalFilter {
    pub fn has_category(&self) -> bool {
        self.category != TOTS
    }

    pub fn has_date(&self) -> bool {
        !self.date.is_tots() || self.from.is_some() || self.to.is_some()
    }

    pub fn has_place(&self) -> bool {
        self.place != CATALUNYA
    }

    /// `/{place}[/{date}][/{category}]`. `tots` is the implicit default and is
    /// never written out.
    pub fn to_path(&self) -> String {
        let mut path = format!("/{}", self.place);
        if !self.date.is_tots() {
            path.push('/');
            path.push_str(self.date.as_str());
        }
        if self.has_category() {
            path.push('/');
            path.push_str(&self.category);
        }
        path
    }

    /// The canonical path plus the canonical query string, if any.
    pub fn to_url(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(search) = &self.search {
            query.append_pair("search", search);
        }
        if let Some(geo) = &self.geo {
            query.append_pair("lat", &geo.lat.to_string());
            query.append_pair("lon", &geo.lon.to_string());
            query.append_pair("radius", &geo.radius_km.to_string());
        }
        if let Some(from) = &self.from {
            query.append_pair("from", &from.to_string());
        }
        if let Some(to) = &self.to {
            query.append_pair("to", &to.to_string());
        }
        if self.page > 0 {
            query.append_pair("page", &self.page.to_string());
        }
        if self.size != DEFAULT_PAGE_SIZE {
            query.append_pair("size", &self.size.to_string());
        }

        let query = query.finish();
        if query.is_empty() {
            self.to_path()
        } else {
            format!("{}?{}", self.to_path(), query)
        }
    }
}

/// Partial projection of a [`CanonicalFilter`] as sent to the backend.
/// Absent fields do not filter.
#[derive(Clone, Debug, PartialEq)]
pub struct EventQuery {
    pub place: Option<String>,
    pub date: Option<DateFilter>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub geo: Option<Geo>,
    pub from: Option<Date>,
    pub to: Option<Date>,
    pub page: u32,
    pub size: u32,
}

impl From<&CanonicalFilter> for EventQuery {
    fn from(filter: &CanonicalFilter) -> Self {
        EventQuery {
            place: Some(filter.place.clone()).filter(|_| filter.has_place()),
            date: Some(filter.date).filter(|d| !d.is_tots()),
            category: Some(filter.category.clone()).filter(|_| filter.has_category()),
            search: filter.search.clone(),
            geo: filter.geo,
            from: filter.from,
            to: filter.to,
            page: filter.page,
            size: filter.size,
        }
    }
}

impl EventQuery {
    /// Whole of Catalonia, no filters.
    pub fn unscoped(page: u32, size: u32) -> Self {
        EventQuery {
            place: None,
            date: None,
            category: None,
            search: None,
            geo: None,
            from: None,
            to: None,
            page,
            size,
        }
    }

    pub fn without_category(mut self) -> Self {
        self.category = None;
        self
    }

    /// Drops the date keyword and the custom range.
    pub fn without_date(mut self) -> Self {
        self.date = None;
        self.from = None;
        self.to = None;
        self
    }

    /// Rescopes the query to another place. Coordinates belong to the old
    /// place and are dropped.
    pub fn in_place(mut self, place: impl Into<String>) -> Self {
        self.place = Some(place.into());
        self.geo = None;
        self
    }

    pub fn is_unscoped(&self) -> bool {
        *self == EventQuery::unscoped(self.page, self.size)
    }

    /// Query string parameters understood by the backend's event listing.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(place) = &self.place {
            pairs.push(("place", place.clone()));
        }
        if let Some(date) = &self.date {
            pairs.push(("byDate", date.as_str().to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("term", search.clone()));
        }
        if let Some(geo) = &self.geo {
            pairs.push(("lat", geo.lat.to_string()));
            pairs.push(("lon", geo.lon.to_string()));
            pairs.push(("radius", geo.radius_km.to_string()));
        }
        if let Some(from) = &self.from {
            pairs.push(("from", from.to_string()));
        }
        if let Some(to) = &self.to {
            pairs.push(("to", to.to_string()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("size", self.size.to_string()));
        pairs
    }
}

/// A resolved filter together with the path segments that were ignored.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub filter: CanonicalFilter,
    pub dropped: Vec<String>,
}

impl Resolution {
    /// True when the requested segments already spell the canonical path:
    /// nothing dropped, same order, same case. The bare root counts as
    /// canonical.
    pub fn is_canonical_path<S: AsRef<str>>(&self, segments: &[S]) -> bool {
        if !self.dropped.is_empty() {
            return false;
        }
        if segments.is_empty() {
            return true;
        }
        let requested = format!(
            "/{}",
            segments
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join("/")
        );
        requested == self.filter.to_path()
    }
}

/// Splits a request path into its non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

pub fn resolve<S: AsRef<str>>(
    segments: &[S],
    query: &HashMap<String, String>,
    known_categories: &HashSet<String>,
) -> CanonicalFilter {
    resolve_route(segments, query, known_categories).filter
}

pub fn resolve_route<S: AsRef<str>>(
    segments: &[S],
    query: &HashMap<String, String>,
    known_categories: &HashSet<String>,
) -> Resolution {
    let mut dropped = Vec::new();
    let mut segments = segments.iter().map(|s| normalize_segment(s.as_ref()));

    let place = segments
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| CATALUNYA.to_string());

    let mut date: Option<DateFilter> = None;
    let mut category: Option<String> = None;

    for (position, segment) in segments.enumerate() {
        // Only the second and third positions carry filters.
        if position >= 2 {
            dropped.push(segment);
            continue;
        }

        if let Some(keyword) = DateFilter::from_keyword(&segment) {
            if date.is_none() {
                date = Some(keyword);
                continue;
            }
        } else if category.is_none() && known_categories.contains(&segment) {
            category = Some(segment);
            continue;
        }

        dropped.push(segment);
    }

    let (from, to) = parse_range(query.get("from"), query.get("to"));

    let filter = CanonicalFilter {
        place,
        date: date.unwrap_or(DateFilter::Tots),
        category: category.unwrap_or_else(|| TOTS.to_string()),
        search: query
            .get("search")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        geo: parse_geo(query),
        from,
        to,
        page: parse_integer(query.get("page"))
            .map(|p| p.clamp(0, u32::MAX as i64) as u32)
            .unwrap_or(0),
        size: parse_integer(query.get("size"))
            .map(|s| s.clamp(1, MAX_PAGE_SIZE as i64) as u32)
            .unwrap_or(DEFAULT_PAGE_SIZE),
    };

    Resolution { filter, dropped }
}

fn normalize_segment(segment: &str) -> String {
    segment.trim().to_lowercase()
}

fn parse_number(value: Option<&String>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_integer(value: Option<&String>) -> Option<i64> {
    // Saturating cast: huge values clamp instead of wrapping.
    parse_number(value).map(|v| v.trunc() as i64)
}

fn parse_in_range(value: Option<&String>, min: f64, max: f64) -> Option<f64> {
    parse_number(value).filter(|v| (min..=max).contains(v))
}

fn parse_geo(query: &HashMap<String, String>) -> Option<Geo> {
    let lat = parse_in_range(query.get("lat"), -90.0, 90.0)?;
    let lon = parse_in_range(query.get("lon"), -180.0, 180.0)?;
    // The default only covers a missing radius; a malformed one drops the geo filter.
    let radius_km = match query.get("radius") {
        None => DEFAULT_RADIUS_KM,
        radius => parse_number(radius).filter(|r| *r > 0.0 && *r <= MAX_RADIUS_KM)?,
    };

    Some(Geo {
        lat,
        lon,
        radius_km,
    })
}

fn parse_range(from: Option<&String>, to: Option<&String>) -> (Option<Date>, Option<Date>) {
    let from = from.and_then(|d| d.trim().parse::<Date>().ok());
    let to = to.and_then(|d| d.trim().parse::<Date>().ok());

    match (from, to) {
        // An inverted range cannot match anything.
        (Some(f), Some(t)) if f > t => (None, None),
        range => range,
    }
}
