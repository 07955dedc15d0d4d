//! Per-server connection settings.
//!
//! Each setting is read from `<server>_<VAR>` first, then the unprefixed
//! process-wide `<VAR>`, then a hard default. Settings are read once, at
//! connection construction, and never re-read.

use crate::error::{QuarryError, Result};
use crate::obfuscate;
use tracing::warn;

pub const HOST_VAR: &str = "QUARRY_SQL_DBHOST";
pub const PORT_VAR: &str = "QUARRY_SQL_PORT";
pub const DB_VAR: &str = "QUARRY_SQL_DB";
pub const TABLE_VAR: &str = "QUARRY_SQL_TABLE";
pub const USER_VAR: &str = "QUARRY_SQL_USER";
pub const PASSWORD_VAR: &str = "QUARRY_SQL_PASSWD";
pub const WAIT_TIMEOUT_VAR: &str = "QUARRY_SQL_WAIT_TIMEOUT";

const DEFAULT_PORT: u16 = 3306;
const DEFAULT_DB: &str = "usd";
const DEFAULT_TABLE: &str = "headers";
const DEFAULT_USER: &str = "root";
// Obfuscated placeholder, never a real credential (see `obfuscate`).
const DEFAULT_PASSWORD_OBFUSCATED: &str = "MTIzNDU2Nzg=";

/// Settings for one server's connection, resolved from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub table: String,
    pub user: String,
    pub password: String,
    /// When set, `SET SESSION wait_timeout` is issued right after connect.
    pub wait_timeout: Option<u32>,
}

impl ServerConfig {
    /// Read settings for `server` from the process environment.
    pub fn from_env(server: &str) -> Result<Self> {
        Self::from_lookup(server, |var| std::env::var(var).ok())
    }

    /// Read settings for `server` through an arbitrary key lookup. Tests use
    /// this to supply environments without mutating the process.
    pub fn from_lookup<F>(server: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let scoped = |var: &str| {
            lookup(&format!("{server}_{var}")).or_else(|| lookup(var))
        };

        let host = scoped(HOST_VAR).ok_or_else(|| {
            QuarryError::Config(format!(
                "no database host for '{server}' - set ${HOST_VAR}"
            ))
        })?;

        let port = match scoped(PORT_VAR) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("invalid {PORT_VAR} value '{raw}', using {DEFAULT_PORT}");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let table = scoped(TABLE_VAR).unwrap_or_else(|| DEFAULT_TABLE.to_string());
        // The table name is interpolated into query text, so it is restricted
        // to identifier characters; key values are always bound as parameters.
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(QuarryError::Config(format!(
                "invalid table name '{table}' for '{server}'"
            )));
        }

        let raw_password = scoped(PASSWORD_VAR)
            .unwrap_or_else(|| DEFAULT_PASSWORD_OBFUSCATED.to_string());
        let password = obfuscate::decode(&raw_password).unwrap_or_else(|| {
            warn!("{PASSWORD_VAR} for '{server}' is not in encoded form, using it verbatim");
            raw_password
        });

        let wait_timeout = scoped(WAIT_TIMEOUT_VAR).and_then(|raw| match raw.parse() {
            Ok(secs) => Some(secs),
            Err(_) => {
                warn!("invalid {WAIT_TIMEOUT_VAR} value '{raw}', ignoring");
                None
            }
        });

        Ok(Self {
            host,
            port,
            database: scoped(DB_VAR).unwrap_or_else(|| DEFAULT_DB.to_string()),
            table,
            user: scoped(USER_VAR).unwrap_or_else(|| DEFAULT_USER.to_string()),
            password,
            wait_timeout,
        })
    }
}
