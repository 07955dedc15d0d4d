//! Pool of per-server connections.
//!
//! Connections are created lazily, keyed by server identifier, and stored in
//! an ordered vector for binary-search lookup. The pool lock is held only
//! for lookup and insert - with one deliberate exception: creating a new
//! connection opens its session while the lock is held, so concurrent first
//! contact to unrelated servers serializes. Relaxing that would change
//! failure and ordering semantics under concurrent first use, so it stays.
//!
//! The registry is an owned, injected instance with an explicit lifecycle;
//! there is no process-wide singleton.

use crate::connection::Connection;
use crate::session::SessionFactory;
use std::sync::{Arc, Mutex};
use tracing::debug;

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct ConnectionRegistry {
    factory: Arc<dyn SessionFactory>,
    lookup: EnvLookup,
    pool: Mutex<Vec<(String, Arc<Connection>)>>,
}

impl ConnectionRegistry {
    /// A registry whose connections read their configuration from the
    /// process environment.
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self::with_lookup(factory, Arc::new(|var: &str| std::env::var(var).ok()))
    }

    /// A registry with an explicit configuration lookup. Tests use this to
    /// supply environments without mutating the process.
    pub fn with_lookup(factory: Arc<dyn SessionFactory>, lookup: EnvLookup) -> Self {
        Self {
            factory,
            lookup,
            pool: Mutex::new(Vec::new()),
        }
    }

    /// Find the connection for `server`, creating it (and opening its
    /// session) if this is the first contact. Dead connections are pooled
    /// like live ones so the failure is not retried per call.
    pub fn get_or_create(&self, server: &str) -> Arc<Connection> {
        let mut pool = self.pool.lock().unwrap();
        match pool.binary_search_by(|(name, _)| name.as_str().cmp(server)) {
            Ok(index) => pool[index].1.clone(),
            Err(index) => {
                debug!("opening connection for '{server}'");
                let conn = Arc::new(Connection::open(
                    server,
                    self.factory.as_ref(),
                    &*self.lookup,
                ));
                pool.insert(index, (server.to_string(), conn.clone()));
                conn
            }
        }
    }

    /// Lookup without creation.
    pub fn get(&self, server: &str) -> Option<Arc<Connection>> {
        let pool = self.pool.lock().unwrap();
        pool.binary_search_by(|(name, _)| name.as_str().cmp(server))
            .ok()
            .map(|index| pool[index].1.clone())
    }

    /// Drop every pooled connection. Safe to call concurrently with
    /// resolutions (same lock); in-flight operations finish on their own
    /// reference, and each session closes when its last reference drops.
    pub fn clear(&self) {
        self.pool.lock().unwrap().clear();
    }
}
