use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

/// One row of the coordinate cache.
///
/// `coords` doubles as the resolved flag: a record without coordinates is the
/// durable "lookup attempted, nothing usable came back" sentinel that keeps a
/// place from being queried twice.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub name: String,
    pub coords: Option<(f64, f64)>,
    pub address: Option<String>,
    pub last_updated: OffsetDateTime,
}

impl Record {
    pub fn located(name: &str, lat: f64, lon: f64, address: &str) -> Record {
        Record {
            name: name.to_string(),
            coords: Some((lat, lon)),
            address: Some(address.to_string()),
            last_updated: OffsetDateTime::now_utc(),
        }
    }

    pub fn sentinel(name: &str) -> Record {
        Record {
            name: name.to_string(),
            coords: None,
            address: None,
            last_updated: OffsetDateTime::now_utc(),
        }
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS places (
    name TEXT PRIMARY KEY,
    latitude REAL,
    longitude REAL,
    address TEXT,
    resolved INTEGER NOT NULL,
    last_updated TEXT NOT NULL
)";

/// Durable name → coordinates cache, one SQLite file.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (creating if needed) the database at `path` and ensures the
    /// schema exists. Safe to call on every start.
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Store> {
        Store::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> rusqlite::Result<Store> {
        Store::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> rusqlite::Result<Store> {
        conn.execute(SCHEMA, [])?;
        Ok(Store { conn })
    }

    /// Whether any record exists for `name`, resolved or sentinel.
    pub fn contains(&self, name: &str) -> rusqlite::Result<bool> {
        let mut stmt = self.conn.prepare("SELECT 1 FROM places WHERE name = ?1")?;
        stmt.exists(params![name])
    }

    /// Inserts or replaces the record as a whole; a reader never sees a row
    /// with only some fields updated.
    pub fn upsert(&self, record: &Record) -> rusqlite::Result<()> {
        let (lat, lon) = match record.coords {
            Some((lat, lon)) => (Some(lat), Some(lon)),
            None => (None, None),
        };

        self.conn.execute(
            "INSERT OR REPLACE INTO places
             (name, latitude, longitude, address, resolved, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.name,
                lat,
                lon,
                record.address,
                record.coords.is_some(),
                record.last_updated,
            ],
        )?;

        Ok(())
    }

    pub fn get(&self, name: &str) -> rusqlite::Result<Option<Record>> {
        self.conn
            .query_row(
                "SELECT name, latitude, longitude, address, last_updated
                 FROM places WHERE name = ?1",
                params![name],
                |row| {
                    let lat: Option<f64> = row.get(1)?;
                    let lon: Option<f64> = row.get(2)?;
                    Ok(Record {
                        name: row.get(0)?,
                        coords: lat.zip(lon),
                        address: row.get(3)?,
                        last_updated: row.get(4)?,
                    })
                },
            )
            .optional()
    }

    /// Every resolved place as `(name, lat, lon)`. Sentinels are not ranking
    /// input. Order is whatever the scan returns; callers sort.
    pub fn resolved(&self) -> rusqlite::Result<Vec<(String, f64, f64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, latitude, longitude FROM places WHERE resolved = 1")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        rows.collect()
    }

    /// Drops one record so the next populate run queries it again. Returns
    /// false if there was nothing to drop.
    pub fn purge(&self, name: &str) -> rusqlite::Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM places WHERE name = ?1", params![name])?;
        Ok(n > 0)
    }

    /// (resolved, sentinel) row counts.
    pub fn counts(&self) -> rusqlite::Result<(u64, u64)> {
        self.conn.query_row(
            "SELECT
                 COUNT(*) FILTER (WHERE resolved = 1),
                 COUNT(*) FILTER (WHERE resolved = 0)
             FROM places",
            [],
            |row| {
                let resolved: i64 = row.get(0)?;
                let sentinels: i64 = row.get(1)?;
                Ok((resolved as u64, sentinels as u64))
            },
        )
    }
}
