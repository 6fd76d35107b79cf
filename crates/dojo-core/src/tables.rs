//! Relational table definitions for dojo snapshots.
//!
//! One row struct per table. Occupancy is not stored on rooms; it is
//! carried by the `office_id` / `living_space_id` foreign keys on people.

use rusqlite::{params, Connection, Row};

/// Schema for all three tables. Safe to run against an existing store.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS rooms (
    id       TEXT PRIMARY KEY,
    name     TEXT NOT NULL,
    kind     TEXT CHECK (kind IN ('office', 'living_space')),
    capacity INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS people (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    kind            TEXT NOT NULL CHECK (kind IN ('fellow', 'staff')),
    office_id       TEXT NULL REFERENCES rooms (id),
    living_space_id TEXT NULL REFERENCES rooms (id)
);

CREATE TABLE IF NOT EXISTS fellows (
    id                  TEXT PRIMARY KEY REFERENCES people (id),
    wants_accommodation INTEGER NOT NULL DEFAULT 0
);
";

/// Tables in the order their rows must be deleted
pub const DELETE_ORDER: [&str; 3] = ["fellows", "people", "rooms"];

/// A row type backed by one table
pub trait Record: Sized {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn insert(&self, conn: &Connection) -> rusqlite::Result<()>;
}

// ============================================================================
// ROOMS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRecord {
    /// Slug of the room name
    pub id: String,
    pub name: String,
    /// `office` or `living_space`; rows written by other tools may omit it
    pub kind: Option<String>,
    pub capacity: i64,
}

impl Record for RoomRecord {
    const TABLE: &'static str = "rooms";
    const COLUMNS: &'static [&'static str] = &["id", "name", "kind", "capacity"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            capacity: row.get(3)?,
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.prepare_cached("INSERT INTO rooms (id, name, kind, capacity) VALUES (?1, ?2, ?3, ?4)")?
            .execute(params![self.id, self.name, self.kind, self.capacity])?;
        Ok(())
    }
}

// ============================================================================
// PEOPLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    pub id: String,
    pub name: String,
    /// `fellow` or `staff`
    pub kind: String,
    pub office_id: Option<String>,
    pub living_space_id: Option<String>,
}

impl Record for PersonRecord {
    const TABLE: &'static str = "people";
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "kind", "office_id", "living_space_id"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            office_id: row.get(3)?,
            living_space_id: row.get(4)?,
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.prepare_cached(
            "INSERT INTO people (id, name, kind, office_id, living_space_id) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?
        .execute(params![
            self.id,
            self.name,
            self.kind,
            self.office_id,
            self.living_space_id
        ])?;
        Ok(())
    }
}

/// Fellow-only columns, keyed by person id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FellowRecord {
    pub id: String,
    pub wants_accommodation: bool,
}

impl Record for FellowRecord {
    const TABLE: &'static str = "fellows";
    const COLUMNS: &'static [&'static str] = &["id", "wants_accommodation"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            wants_accommodation: row.get(1)?,
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.prepare_cached("INSERT INTO fellows (id, wants_accommodation) VALUES (?1, ?2)")?
            .execute(params![self.id, self.wants_accommodation])?;
        Ok(())
    }
}

/// Create every table if missing
pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

/// Read a whole table in insertion order
pub fn query_all<R: Record>(conn: &Connection) -> rusqlite::Result<Vec<R>> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY rowid",
        R::COLUMNS.join(", "),
        R::TABLE
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| R::from_row(row))?;
    rows.collect()
}

/// Delete every row of every table, children first
pub fn clear_all(conn: &Connection) -> rusqlite::Result<()> {
    for table in DELETE_ORDER {
        conn.execute(&format!("DELETE FROM {table}"), [])?;
    }
    Ok(())
}
