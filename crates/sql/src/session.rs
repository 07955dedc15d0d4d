//! Session transport: the seam between the cache state machine and the wire.
//!
//! A [`Session`] answers the three queries the state machine needs
//! (existence, timestamp, data fetch) and a [`SessionFactory`] opens one per
//! connection. The production implementation runs over the `mysql` crate;
//! tests substitute in-memory sessions.
//!
//! Result rows are decoded eagerly into typed values. A row with the wrong
//! column count, a wrong column type, or a null cell where data was expected
//! is a [`QuarryError::Decode`], never a loosely-typed value.

use crate::config::ServerConfig;
use crate::error::{QuarryError, Result};
use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder, Row, Value};
use time::macros::format_description;
use time::{Date, Month, PrimitiveDateTime, Time};
use tracing::{debug, warn};

/// One database session. Not safe for concurrent use; the owning connection
/// serializes access behind its mutex.
pub trait Session: Send {
    /// Does a row for `key` exist in `table`?
    fn exists(&mut self, table: &str, key: &str) -> Result<bool>;

    /// Server-side timestamp of `key`, in seconds. Any failure (execution
    /// error, zero rows, malformed cell) is an `Err`, which callers treat as
    /// "could not be determined".
    fn timestamp(&mut self, table: &str, key: &str) -> Result<f64>;

    /// Fetch the blob and its timestamp in one query. `Ok` means the blob
    /// was fetched; the timestamp component is `None` when that column alone
    /// was unparsable.
    fn fetch(&mut self, table: &str, key: &str) -> Result<(Vec<u8>, Option<f64>)>;
}

/// Opens sessions. Injected at registry construction so the whole stack
/// above this seam can run against in-memory sessions.
pub trait SessionFactory: Send + Sync {
    fn open(&self, config: &ServerConfig) -> Result<Box<dyn Session>>;
}

// ==================== MySQL implementation ====================

pub struct MysqlSessionFactory;

impl SessionFactory for MysqlSessionFactory {
    fn open(&self, config: &ServerConfig) -> Result<Box<dyn Session>> {
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(config.host.clone()))
            .tcp_port(config.port)
            .db_name(Some(config.database.clone()))
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()))
            // This layer never reconnects a failed session; keepalive is the
            // only thing holding an idle link open.
            .tcp_keepalive_time_ms(Some(60_000));
        let mut conn = Conn::new(opts)?;

        if let Some(secs) = config.wait_timeout {
            // Validated numeric, safe to interpolate.
            if let Err(e) = conn.query_drop(format!("SET SESSION wait_timeout = {secs}")) {
                warn!("failed to set session wait_timeout to {secs}: {e}");
            }
        }

        Ok(Box::new(MysqlSession { conn }))
    }
}

struct MysqlSession {
    conn: Conn,
}

impl Session for MysqlSession {
    fn exists(&mut self, table: &str, key: &str) -> Result<bool> {
        debug!("existence query for '{key}' in {table}");
        let row: Option<Row> = self.conn.exec_first(
            format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE path = ?)"),
            (key,),
        )?;
        let row = row.ok_or_else(|| {
            QuarryError::Decode("existence query returned no row".to_string())
        })?;
        decode_flag(single_column(&row)?)
    }

    fn timestamp(&mut self, table: &str, key: &str) -> Result<f64> {
        debug!("timestamp query for '{key}' in {table}");
        let row: Option<Row> = self.conn.exec_first(
            format!("SELECT timestamp FROM {table} WHERE path = ? LIMIT 1"),
            (key,),
        )?;
        let row = row.ok_or_else(|| {
            QuarryError::Decode(format!("no row for '{key}'"))
        })?;
        decode_time(single_column(&row)?)
    }

    fn fetch(&mut self, table: &str, key: &str) -> Result<(Vec<u8>, Option<f64>)> {
        debug!("fetch query for '{key}' in {table}");
        let row: Option<Row> = self.conn.exec_first(
            format!("SELECT data, timestamp FROM {table} WHERE path = ? LIMIT 1"),
            (key,),
        )?;
        let row = row.ok_or_else(|| {
            QuarryError::Decode(format!("no row for '{key}'"))
        })?;
        if row.len() != 2 {
            return Err(QuarryError::Decode(format!(
                "expected 2 columns, got {}",
                row.len()
            )));
        }

        let data = match row.as_ref(0) {
            Some(Value::Bytes(bytes)) => bytes.clone(),
            other => {
                return Err(QuarryError::Decode(format!(
                    "expected a blob for '{key}', got {other:?}"
                )));
            }
        };

        let timestamp = row.as_ref(1).and_then(|value| match decode_time(value) {
            Ok(time) => Some(time),
            Err(e) => {
                warn!("fetched '{key}' but could not decode its timestamp: {e}");
                None
            }
        });

        Ok((data, timestamp))
    }
}

// ==================== Row decoding ====================

fn single_column(row: &Row) -> Result<&Value> {
    if row.len() != 1 {
        return Err(QuarryError::Decode(format!(
            "expected 1 column, got {}",
            row.len()
        )));
    }
    row.as_ref(0)
        .ok_or_else(|| QuarryError::Decode("missing column 0".to_string()))
}

fn decode_flag(value: &Value) -> Result<bool> {
    match value {
        Value::Int(n) => Ok(*n != 0),
        Value::UInt(n) => Ok(*n != 0),
        Value::Bytes(raw) => Ok(raw.as_slice() == b"1"),
        other => Err(QuarryError::Decode(format!(
            "expected an existence flag, got {other:?}"
        ))),
    }
}

/// Decode a TIMESTAMP cell to epoch seconds.
///
/// Values are only ever compared against other values for the same entry,
/// so the epoch basis is arbitrary; UTC keeps it independent of the
/// process's timezone.
fn decode_time(value: &Value) -> Result<f64> {
    let decode_err = |e: &dyn std::fmt::Display| QuarryError::Decode(e.to_string());
    match value {
        Value::Date(year, month, day, hour, min, sec, micro) => {
            let month = Month::try_from(*month).map_err(|e| decode_err(&e))?;
            let date = Date::from_calendar_date(*year as i32, month, *day)
                .map_err(|e| decode_err(&e))?;
            let time = Time::from_hms_micro(*hour, *min, *sec, *micro)
                .map_err(|e| decode_err(&e))?;
            Ok(PrimitiveDateTime::new(date, time).assume_utc().unix_timestamp() as f64)
        }
        // Text-protocol results arrive as raw bytes.
        Value::Bytes(raw) => {
            let text = std::str::from_utf8(raw).map_err(|e| decode_err(&e))?;
            let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
            let parsed = PrimitiveDateTime::parse(text, format).map_err(|e| decode_err(&e))?;
            Ok(parsed.assume_utc().unix_timestamp() as f64)
        }
        other => Err(QuarryError::Decode(format!(
            "expected a timestamp, got {other:?}"
        ))),
    }
}
