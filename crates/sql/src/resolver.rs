//! Host-facing facade: `SqlResolver` implements `quarry_plugin::Resolver`
//! over the connection registry.
//!
//! Only `find_asset` creates connections; timestamp and open calls route to
//! an existing connection or degrade to their "not available" defaults.
//! Nothing here returns an error to the host.

use crate::codec;
use crate::registry::ConnectionRegistry;
use crate::session::MysqlSessionFactory;
use quarry_plugin::{Asset, Resolver};
use std::sync::Arc;
use tracing::debug;

pub struct SqlResolver {
    registry: ConnectionRegistry,
}

impl SqlResolver {
    /// A resolver backed by MySQL sessions and process-environment
    /// configuration.
    pub fn new() -> Self {
        Self::with_registry(ConnectionRegistry::new(Arc::new(MysqlSessionFactory)))
    }

    /// A resolver over an explicitly constructed registry (injected session
    /// factory and configuration lookup).
    pub fn with_registry(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }
}

impl Default for SqlResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for SqlResolver {
    fn matches_schema(&self, path: &str) -> bool {
        codec::matches_schema(path)
    }

    fn find_asset(&self, path: &str) -> Option<String> {
        debug!("find_asset('{path}')");
        let uri = codec::parse(path)?;
        let conn = self.registry.get_or_create(&uri.server);
        conn.find_asset(&uri.remote_key())
            .then(|| codec::canonical(&uri))
    }

    fn get_timestamp(&self, path: &str) -> Option<f64> {
        debug!("get_timestamp('{path}')");
        let uri = codec::parse(path)?;
        let conn = self.registry.get(&uri.server)?;
        Some(conn.get_timestamp(&uri.remote_key()))
    }

    fn fetch_to_local(&self, path: &str) -> bool {
        debug!("fetch_to_local('{path}')");
        // Data is materialized by open_asset; this only reports whether the
        // path resolves.
        self.find_asset(path).is_some()
    }

    fn open_asset(&self, path: &str) -> Option<Arc<dyn Asset>> {
        debug!("open_asset('{path}')");
        let uri = codec::parse(path)?;
        let conn = self.registry.get(&uri.server)?;
        let asset = conn.open_asset(&uri.remote_key())?;
        Some(asset)
    }

    fn clear(&self) {
        self.registry.clear();
    }
}
