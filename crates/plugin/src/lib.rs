//! Capability surface for asset resolvers.
//!
//! The host framework programs against these traits:
//! - `Asset` — a materialized asset (buffer view and file-descriptor view)
//! - `Resolver` — a URI-scheme resolver
//! - `ResolverStack` — first-match-wins composition of resolvers
//!
//! This crate has no knowledge of any particular backend; `quarry-sql`
//! provides the database-backed implementation.

mod asset;
mod resolver;

pub use asset::Asset;
pub use resolver::{Resolver, ResolverStack};
