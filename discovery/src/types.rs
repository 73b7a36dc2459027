use serde::{Deserialize, Serialize};

/// Slug of the whole-Catalonia scope. Requests without a place resolve here.
pub const CATALUNYA: &str = "catalunya";

/// Catch-all value for the date and category filters.
pub const TOTS: &str = "tots";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlaceType {
    City,
    Region,
    Country,
}

/// A place as listed by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub id: u64,
    #[serde(rename = "type")]
    pub place_type: PlaceType,
    pub name: String,
    pub slug: String,
}

impl PlaceRecord {
    pub fn new<N, S>(id: u64, place_type: PlaceType, name: N, slug: S) -> Self
    where
        N: Into<String>,
        S: Into<String>,
    {
        PlaceRecord {
            id,
            place_type,
            name: name.into(),
            slug: slug.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRef {
    pub slug: String,
    pub name: String,
}

/// Detail view of a single place. Only cities carry a containing region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceDetail {
    #[serde(flatten)]
    pub place: PlaceRecord,
    #[serde(default)]
    pub region: Option<RegionRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// One page of the backend event listing. An empty `content` is a valid
/// response, not an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsPage {
    pub content: Vec<EventSummary>,
    pub current_page: u32,
    pub page_size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub last: bool,
}

impl EventsPage {
    pub fn empty(page: u32, size: u32) -> Self {
        EventsPage {
            content: Vec::new(),
            current_page: page,
            page_size: size,
            total_elements: 0,
            total_pages: 0,
            last: true,
        }
    }
}

// Detail documents are rendered by the page layer as-is, so they stay opaque here.
pub type EventDetail = serde_json::Value;
pub type NewsDetail = serde_json::Value;
