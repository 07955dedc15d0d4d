//! SQL-backed asset resolver.
//!
//! Resolves `sql://server/key` URIs against a relational database and caches
//! the results. Each server gets one pooled [`Connection`] holding a single
//! database session and a per-key cache whose validity is tied to the
//! server-side timestamp; fetched bytes are exposed through
//! [`MemoryAsset`], either as a shared buffer or as a lazily-created
//! temporary file.
//!
//! The public entry point for host frameworks is [`SqlResolver`], which
//! implements `quarry_plugin::Resolver`.

pub mod asset;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod obfuscate;
pub mod registry;
pub mod resolver;
pub mod session;

pub use asset::MemoryAsset;
pub use connection::{Connection, INVALID_TIME};
pub use error::{QuarryError, Result};
pub use registry::ConnectionRegistry;
pub use resolver::SqlResolver;
pub use session::{MysqlSessionFactory, Session, SessionFactory};
