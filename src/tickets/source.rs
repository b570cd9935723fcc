use super::TicketRecord;
use rusqlite::{params, Connection};
use std::path::Path;
use thiserror::Error;
use time::{format_description::FormatItem, macros::format_description, PrimitiveDateTime};

/// Timestamps are stored as text in this format so that comparing them as
/// strings orders them chronologically.
static TIMESTAMP_FMT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

static SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS ticket (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        date        TEXT NOT NULL,
        checked_in  INTEGER,
        checked_out TEXT,
        mess        TEXT
    );
    CREATE INDEX IF NOT EXISTS ticket_date ON ticket (date);
    CREATE INDEX IF NOT EXISTS ticket_checked_out ON ticket (checked_out);
";

/// A store of tickets.
pub(crate) trait TicketSource {
    /// Returns every ticket opened or closed between `start` and `end`, both
    /// inclusive
    fn find_records_in_range(
        &self,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> Result<Vec<TicketRecord>, SourceError>;
}

/// Error returned when the ticket data could not be loaded
#[derive(Debug, Error)]
pub(crate) enum SourceError {
    #[error("ticket query failed: {0}")]
    Query(#[from] rusqlite::Error),
    #[error("invalid timestamp {0:?} in ticket table")]
    Timestamp(String),
    #[error("failed to format timestamp: {0}")]
    Format(#[from] time::error::Format),
}

/// Tickets kept in the `ticket` table of a SQLite database
#[derive(Debug)]
pub(crate) struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    /// Opens the database at `path`, creating it and the ticket table if they
    /// do not exist yet
    pub(crate) fn open<P: AsRef<Path>>(path: P) -> Result<SqliteSource, SourceError> {
        SqliteSource::with_connection(Connection::open(path)?)
    }

    fn with_connection(conn: Connection) -> Result<SqliteSource, SourceError> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteSource { conn })
    }
}

impl TicketSource for SqliteSource {
    fn find_records_in_range(
        &self,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> Result<Vec<TicketRecord>, SourceError> {
        let start = start.format(&TIMESTAMP_FMT)?;
        let end = end.format(&TIMESTAMP_FMT)?;
        let mut stmt = self.conn.prepare(
            "SELECT date, checked_in, checked_out FROM ticket
             WHERE (date BETWEEN ?1 AND ?2)
                OR (checked_out BETWEEN ?1 AND ?2)
             ORDER BY date ASC",
        )?;
        let rows = stmt.query_map(params![start, end], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<bool>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;
        let mut records = Vec::new();
        for r in rows {
            let (open_date, checked_in, checked_out) = r?;
            records.push(TicketRecord {
                open_date: parse_timestamp(&open_date)?,
                // A NULL flag means the ticket was never checked in.
                checked_in: checked_in.unwrap_or(false),
                checked_out: checked_out.as_deref().map(parse_timestamp).transpose()?,
            });
        }
        Ok(records)
    }
}

fn parse_timestamp(s: &str) -> Result<PrimitiveDateTime, SourceError> {
    PrimitiveDateTime::parse(s, &TIMESTAMP_FMT).map_err(|_| SourceError::Timestamp(s.to_owned()))
}

/// Tickets held in memory
#[cfg(test)]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct MemorySource {
    records: Vec<TicketRecord>,
}

#[cfg(test)]
impl MemorySource {
    pub(crate) fn new<I: IntoIterator<Item = TicketRecord>>(iter: I) -> MemorySource {
        MemorySource {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
impl TicketSource for MemorySource {
    fn find_records_in_range(
        &self,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> Result<Vec<TicketRecord>, SourceError> {
        let in_range = |dt: PrimitiveDateTime| start <= dt && dt <= end;
        Ok(self
            .records
            .iter()
            .filter(|r| in_range(r.open_date) || r.checked_out.is_some_and(in_range))
            .copied()
            .collect())
    }
}

#[cfg(test)]
impl SqliteSource {
    pub(crate) fn open_in_memory() -> Result<SqliteSource, SourceError> {
        SqliteSource::with_connection(Connection::open_in_memory()?)
    }

    pub(crate) fn insert(&self, record: &TicketRecord, message: &str) -> Result<(), SourceError> {
        let checked_out = record
            .checked_out
            .map(|dt| dt.format(&TIMESTAMP_FMT))
            .transpose()?;
        self.conn.execute(
            "INSERT INTO ticket (date, checked_in, checked_out, mess) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.open_date.format(&TIMESTAMP_FMT)?,
                record.checked_in,
                checked_out,
                message
            ],
        )?;
        Ok(())
    }
}
