//! URI scheme recognition and splitting.
//!
//! Paths are claimed when they carry the `sql:` prefix (long form `sql://`
//! also accepted). The canonical identifier handed back to the host always
//! uses the short form. Pure functions, no side effects.

pub const SCHEME_PREFIX: &str = "sql://";
pub const SCHEME_PREFIX_SHORT: &str = "sql:";

/// A parsed `sql:` URI: the server identifier that selects a pooled
/// connection, and the opaque key within that server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUri {
    pub server: String,
    pub key: String,
}

impl ParsedUri {
    /// The key used for cache lookups and database queries: the full
    /// scheme-stripped remainder, `server/key`.
    pub fn remote_key(&self) -> String {
        format!("{}/{}", self.server, self.key)
    }
}

/// True iff `path` carries the scheme prefix (either form).
pub fn matches_schema(path: &str) -> bool {
    path.starts_with(SCHEME_PREFIX_SHORT)
}

/// Strip the scheme prefix and split the remainder at the first `/` into
/// server and key. Backslashes are normalized to forward slashes. Returns
/// `None` when the prefix is absent or the server segment is empty.
pub fn parse(path: &str) -> Option<ParsedUri> {
    let rest = path
        .strip_prefix(SCHEME_PREFIX)
        .or_else(|| path.strip_prefix(SCHEME_PREFIX_SHORT))?;
    let rest = rest.replace('\\', "/");
    let (server, key) = rest.split_once('/')?;
    if server.is_empty() {
        return None;
    }
    Some(ParsedUri {
        server: server.to_string(),
        key: key.to_string(),
    })
}

/// The canonical (short-prefix) identifier for a parsed URI.
pub fn canonical(uri: &ParsedUri) -> String {
    format!("{}{}", SCHEME_PREFIX_SHORT, uri.remote_key())
}
