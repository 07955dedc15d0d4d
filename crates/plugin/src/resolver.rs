use crate::asset::Asset;
use std::sync::Arc;

/// A URI-scheme resolver.
///
/// Uses capability composition instead of inheritance: variants are plain
/// trait objects and a `ResolverStack` dispatches between them. Failures
/// never escape as errors — every operation degrades to its "not found"
/// default and the host applies its own fallback.
pub trait Resolver: Send + Sync {
    /// True iff this resolver claims `path`.
    fn matches_schema(&self, path: &str) -> bool;

    /// Resolve `path` to its canonical identifier, or `None` when the asset
    /// does not exist (or the path is malformed for this scheme).
    fn find_asset(&self, path: &str) -> Option<String>;

    /// Last-known modification time of `path` in seconds. `None` means
    /// "not available" (nothing was ever resolved for this path).
    fn get_timestamp(&self, path: &str) -> Option<f64>;

    /// Ensure a local materialization of `path` is possible. Resolvers that
    /// materialize on open report whether the path is resolved.
    fn fetch_to_local(&self, path: &str) -> bool;

    /// Open `path` as an `Asset`, fetching if necessary.
    fn open_asset(&self, path: &str) -> Option<Arc<dyn Asset>>;

    /// Drop all cached state. The resolver behaves as freshly constructed
    /// afterwards.
    fn clear(&self) {}
}

/// First-match-wins composition of resolvers.
///
/// The first variant whose `matches_schema` claims a path handles every
/// operation for it. The host appends its own default resolver as the last
/// variant.
#[derive(Default)]
pub struct ResolverStack {
    resolvers: Vec<Arc<dyn Resolver>>,
}

impl ResolverStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resolver: Arc<dyn Resolver>) {
        self.resolvers.push(resolver);
    }

    fn route(&self, path: &str) -> Option<&Arc<dyn Resolver>> {
        self.resolvers.iter().find(|r| r.matches_schema(path))
    }
}

impl Resolver for ResolverStack {
    fn matches_schema(&self, path: &str) -> bool {
        self.route(path).is_some()
    }

    fn find_asset(&self, path: &str) -> Option<String> {
        self.route(path)?.find_asset(path)
    }

    fn get_timestamp(&self, path: &str) -> Option<f64> {
        self.route(path)?.get_timestamp(path)
    }

    fn fetch_to_local(&self, path: &str) -> bool {
        self.route(path).is_some_and(|r| r.fetch_to_local(path))
    }

    fn open_asset(&self, path: &str) -> Option<Arc<dyn Asset>> {
        self.route(path)?.open_asset(path)
    }

    fn clear(&self) {
        for resolver in &self.resolvers {
            resolver.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct PrefixResolver {
        prefix: &'static str,
        hits: AtomicUsize,
    }

    impl PrefixResolver {
        fn new(prefix: &'static str) -> Arc<Self> {
            Arc::new(Self {
                prefix,
                hits: AtomicUsize::new(0),
            })
        }
    }

    impl Resolver for PrefixResolver {
        fn matches_schema(&self, path: &str) -> bool {
            path.starts_with(self.prefix)
        }

        fn find_asset(&self, path: &str) -> Option<String> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Some(path.to_string())
        }

        fn get_timestamp(&self, _path: &str) -> Option<f64> {
            Some(1.0)
        }

        fn fetch_to_local(&self, _path: &str) -> bool {
            true
        }

        fn open_asset(&self, _path: &str) -> Option<Arc<dyn Asset>> {
            None
        }
    }

    #[test]
    fn first_matching_resolver_wins() {
        let a = PrefixResolver::new("a:");
        let b = PrefixResolver::new("b:");
        let both = PrefixResolver::new("a:"); // shadowed by `a`

        let mut stack = ResolverStack::new();
        stack.push(a.clone());
        stack.push(b.clone());
        stack.push(both.clone());

        assert_eq!(stack.find_asset("a:x").as_deref(), Some("a:x"));
        assert_eq!(stack.find_asset("b:y").as_deref(), Some("b:y"));
        assert_eq!(a.hits.load(Ordering::SeqCst), 1);
        assert_eq!(b.hits.load(Ordering::SeqCst), 1);
        assert_eq!(both.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unclaimed_path_is_not_handled() {
        let mut stack = ResolverStack::new();
        stack.push(PrefixResolver::new("a:"));

        assert!(!stack.matches_schema("/local/file.txt"));
        assert!(stack.find_asset("/local/file.txt").is_none());
        assert!(!stack.fetch_to_local("/local/file.txt"));
    }
}
