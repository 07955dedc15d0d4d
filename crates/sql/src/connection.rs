//! Per-server connection: one database session plus the cache of everything
//! ever resolved through it.
//!
//! Entry lifecycle: `Missing -> NeedsFetch -> Fetched`, with
//! `Fetched -> NeedsFetch` on staleness detection and
//! `NeedsFetch -> Missing` on fetch failure. A `Missing` entry is only ever
//! revived by a fresh existence check from `find_asset`; timestamp queries
//! never resurrect it. Entries are created once per key and never evicted.
//!
//! The session and the entry table live together behind one mutex: the
//! session is not safe for concurrent use, so every cache access and every
//! query against the same server serializes. That single mutex is also the
//! backpressure mechanism - at most one fetch per connection is in flight.

use crate::asset::MemoryAsset;
use crate::config::ServerConfig;
use crate::session::{Session, SessionFactory};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Sentinel for "timestamp could not be determined".
pub const INVALID_TIME: f64 = f64::MIN;

/// Initial timestamp of a resolved-but-never-fetched entry, and the default
/// reported when no timestamp is available. Anything the server reports is
/// newer than this, so a first fetch is always considered worthwhile.
const NEVER_FETCHED: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheState {
    Missing,
    NeedsFetch,
    Fetched,
}

struct CacheEntry {
    state: CacheState,
    local_path: String,
    timestamp: f64,
    asset: Option<Arc<MemoryAsset>>,
}

impl CacheEntry {
    fn missing() -> Self {
        Self {
            state: CacheState::Missing,
            local_path: String::new(),
            timestamp: NEVER_FETCHED,
            asset: None,
        }
    }
}

struct Inner {
    session: Option<Box<dyn Session>>,
    entries: HashMap<String, CacheEntry>,
}

/// One pooled connection. A connection whose session failed to open is
/// "dead": it stays constructed and answers every operation with its failure
/// default for the rest of its lifetime (no reconnect attempts).
pub struct Connection {
    table: String,
    inner: Mutex<Inner>,
}

impl Connection {
    /// Read configuration for `server` through `lookup` and open a session.
    /// Configuration or connect failures log a warning and yield a dead
    /// connection.
    pub fn open(
        server: &str,
        factory: &dyn SessionFactory,
        lookup: &(dyn Fn(&str) -> Option<String>),
    ) -> Self {
        let config = match ServerConfig::from_lookup(server, lookup) {
            Ok(config) => config,
            Err(e) => {
                warn!("not connecting to '{server}': {e}");
                return Self::with_session(String::new(), None);
            }
        };
        let session = match factory.open(&config) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("failed to connect to '{server}': {e}");
                None
            }
        };
        Self::with_session(config.table, session)
    }

    /// Build a connection over an already-opened session (`None` for a dead
    /// connection). Public seam for embedding and for tests.
    pub fn with_session(table: impl Into<String>, session: Option<Box<dyn Session>>) -> Self {
        Self {
            table: table.into(),
            inner: Mutex::new(Inner {
                session,
                entries: HashMap::new(),
            }),
        }
    }

    /// Resolve `key`: report whether the asset exists, creating or updating
    /// its cache entry. Never queries when the entry is already resolved.
    pub fn find_asset(&self, key: &str) -> bool {
        debug!("find_asset '{key}'");
        // The scheme's contract: resolvable keys carry an extension.
        if !key.rsplit_once('.').is_some_and(|(_, ext)| !ext.is_empty()) {
            debug!("find_asset: '{key}' has no extension");
            return false;
        }

        let inner = &mut *self.inner.lock().unwrap();
        let Inner { session, entries } = inner;
        let Some(session) = session.as_deref_mut() else {
            debug!("find_asset: no session");
            return false;
        };

        match entries.get_mut(key) {
            Some(entry) if entry.state != CacheState::Missing => {
                debug!("find_asset: cached '{}'", entry.local_path);
                true
            }
            // A cached negative is re-validated; this is the only path that
            // can move an entry out of `Missing`.
            Some(entry) => run_existence_check(session, &self.table, key, entry),
            None => {
                let mut entry = CacheEntry::missing();
                let found = run_existence_check(session, &self.table, key, &mut entry);
                // Insert on failure too, so negatives hit the cache table.
                entries.insert(key.to_string(), entry);
                found
            }
        }
    }

    /// Server-side timestamp of `key`. Defaults to `NEVER_FETCHED` when the
    /// connection is dead or the entry was never resolved.
    pub fn get_timestamp(&self, key: &str) -> f64 {
        let inner = &mut *self.inner.lock().unwrap();
        let Inner { session, entries } = inner;
        let Some(session) = session.as_deref_mut() else {
            return NEVER_FETCHED;
        };
        let Some(entry) = entries.get_mut(key) else {
            warn!("'{key}' was not resolved before querying timestamps");
            return NEVER_FETCHED;
        };
        if entry.state == CacheState::Missing {
            warn!("'{key}' is missing when querying timestamps");
            return NEVER_FETCHED;
        }

        match session.timestamp(&self.table, &entry.local_path) {
            Err(e) => {
                entry.state = CacheState::Missing;
                warn!("failed to read timestamp for '{key}', returning the previous value: {e}");
                // Deliberately inconsistent, kept for compatibility: the
                // entry is now Missing yet the previously cached timestamp
                // is what callers observe.
                entry.timestamp
            }
            Ok(stamp) => {
                if stamp > entry.timestamp {
                    debug!(
                        "'{key}' timestamp changed from {} to {stamp}",
                        entry.timestamp
                    );
                    entry.state = CacheState::NeedsFetch;
                }
                stamp
            }
        }
    }

    /// Open `key`, fetching its bytes if the cached copy is absent or stale.
    pub fn open_asset(&self, key: &str) -> Option<Arc<MemoryAsset>> {
        debug!("open_asset '{key}'");
        let inner = &mut *self.inner.lock().unwrap();
        let Inner { session, entries } = inner;
        let Some(session) = session.as_deref_mut() else {
            debug!("open_asset: no session");
            return None;
        };
        let Some(entry) = entries.get_mut(key) else {
            warn!("'{key}' was not resolved before fetching");
            return None;
        };
        if entry.state == CacheState::Missing {
            debug!("open_asset: '{key}' missing from database, no fetch");
            return None;
        }

        if entry.state == CacheState::Fetched {
            // Nothing guarantees get_timestamp ran since the fetch; re-check
            // before serving cached bytes.
            match session.timestamp(&self.table, &entry.local_path) {
                Ok(stamp) if stamp > entry.timestamp => {
                    debug!("open_asset: '{key}' data is out of date");
                }
                _ => return entry.asset.clone(),
            }
        }

        // If the fetch fails midway the entry is safely re-checkable rather
        // than falsely Fetched.
        entry.state = CacheState::Missing;
        match session.fetch(&self.table, &entry.local_path) {
            Ok((bytes, stamp)) => {
                let asset = Arc::new(MemoryAsset::new(bytes));
                entry.asset = Some(asset.clone());
                entry.state = CacheState::Fetched;
                entry.timestamp = stamp.unwrap_or_else(|| {
                    debug!("open_asset: fetched '{key}' without a usable timestamp");
                    INVALID_TIME
                });
                Some(asset)
            }
            Err(e) => {
                warn!("failed to fetch '{key}': {e}");
                None
            }
        }
    }
}

fn run_existence_check(
    session: &mut dyn Session,
    table: &str,
    key: &str,
    entry: &mut CacheEntry,
) -> bool {
    match session.exists(table, key) {
        Ok(true) => {
            debug!("find_asset: found '{key}'");
            entry.local_path = key.to_string();
            entry.state = CacheState::NeedsFetch;
            entry.timestamp = NEVER_FETCHED;
            true
        }
        Ok(false) => {
            debug!("find_asset: '{key}' not present");
            entry.state = CacheState::Missing;
            false
        }
        Err(e) => {
            warn!("existence query for '{key}' failed: {e}");
            entry.state = CacheState::Missing;
            false
        }
    }
}
