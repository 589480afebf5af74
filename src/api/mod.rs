//! Backend API access: the fetch seam used by the entity cache and the
//! reqwest-backed client that implements it.

mod client;
mod fetch;

pub use client::{ApiClient, parse_collection};
pub use fetch::EntityFetcher;

#[cfg(test)]
pub(crate) use fetch::testing;
