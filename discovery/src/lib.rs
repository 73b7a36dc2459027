//! Discovery core of the Esdeveniments.cat event listings.
//!
//! Browse URLs are resolved into canonical filters, unknown place slugs are
//! redirected to their canonical form when possible, and listings that come
//! back empty are progressively broadened until something can be shown.

pub mod alias;
pub mod api;
pub mod backend;
pub mod cache;
pub mod cascade;
pub mod config;
pub mod discovery;
pub mod filter;
pub mod metrics_defs;
pub mod negative_cache;
pub mod types;

#[cfg(test)]
mod testutils;

pub use api::{router, serve};
pub use discovery::{BrowseOutcome, Discovery, DiscoveryError};
pub use filter::{CanonicalFilter, resolve, resolve_route};
