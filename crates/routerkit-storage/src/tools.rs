//! Relational tool store
//!
//! Tool definitions persist in a single SQLite table. The connection is
//! serialized behind a lock; tool CRUD is rare and never on the job
//! executor's path.

use parking_lot::Mutex;
use routerkit_core::{Error, Result, SpindleDirection, Tool, ToolCreate, ToolUpdate};
use rusqlite::Connection;
use std::path::Path;

/// SQLite-backed store of tool definitions
pub struct ToolStore {
    conn: Mutex<Connection>,
}

impl ToolStore {
    /// Open (and migrate if needed) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage_err)?;
        Self::with_connection(conn)
    }

    /// An in-memory store for tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tools (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                diameter_mm REAL NOT NULL,
                length_mm REAL NOT NULL,
                rpm INTEGER NOT NULL,
                feed_mm_min REAL NOT NULL,
                direction TEXT NOT NULL,
                climb INTEGER NOT NULL
            )",
            (),
        )
        .map_err(storage_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// All tools ordered by id
    pub fn list_tools(&self) -> Result<Vec<Tool>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, diameter_mm, length_mm, rpm, feed_mm_min, direction, climb
                 FROM tools ORDER BY id",
            )
            .map_err(storage_err)?;
        let rows = stmt
            .query_map((), row_to_tool)
            .map_err(storage_err)?
            .collect::<rusqlite::Result<Vec<Tool>>>()
            .map_err(storage_err)?;
        Ok(rows)
    }

    /// Look up one tool
    pub fn get_tool(&self, id: i64) -> Result<Option<Tool>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, diameter_mm, length_mm, rpm, feed_mm_min, direction, climb
                 FROM tools WHERE id = ?1",
            )
            .map_err(storage_err)?;
        let mut rows = stmt.query([id]).map_err(storage_err)?;
        match rows.next().map_err(storage_err)? {
            Some(row) => Ok(Some(row_to_tool(row).map_err(storage_err)?)),
            None => Ok(None),
        }
    }

    /// Insert a validated tool and return it with its assigned id
    pub fn add_tool(&self, tool: ToolCreate) -> Result<Tool> {
        tool.validate()?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO tools (name, diameter_mm, length_mm, rpm, feed_mm_min, direction, climb)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                &tool.name,
                tool.diameter_mm,
                tool.length_mm,
                tool.rpm,
                tool.feed_mm_min,
                tool.direction.to_string(),
                tool.climb as i64,
            ),
        )
        .map_err(storage_err)?;
        let id = conn.last_insert_rowid();
        Ok(tool.into_tool(id))
    }

    /// Merge a partial update into an existing tool
    pub fn update_tool(&self, id: i64, update: ToolUpdate) -> Result<Tool> {
        update.validate()?;
        let current = self
            .get_tool(id)?
            .ok_or_else(|| Error::not_found("tool", id.to_string()))?;
        let merged = update.apply_to(&current);

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE tools
             SET name = ?1, diameter_mm = ?2, length_mm = ?3, rpm = ?4,
                 feed_mm_min = ?5, direction = ?6, climb = ?7
             WHERE id = ?8",
            (
                &merged.name,
                merged.diameter_mm,
                merged.length_mm,
                merged.rpm,
                merged.feed_mm_min,
                merged.direction.to_string(),
                merged.climb as i64,
                id,
            ),
        )
        .map_err(storage_err)?;
        Ok(merged)
    }

    /// Remove a tool
    pub fn delete_tool(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute("DELETE FROM tools WHERE id = ?1", [id])
            .map_err(storage_err)?;
        if changed == 0 {
            return Err(Error::not_found("tool", id.to_string()));
        }
        Ok(())
    }
}

/// Map one result row to a tool
fn row_to_tool(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tool> {
    let direction: String = row.get(6)?;
    Ok(Tool {
        id: row.get(0)?,
        name: row.get(1)?,
        diameter_mm: row.get(2)?,
        length_mm: row.get(3)?,
        rpm: row.get(4)?,
        feed_mm_min: row.get(5)?,
        direction: direction
            .parse::<SpindleDirection>()
            .unwrap_or(SpindleDirection::Off),
        climb: row.get::<_, i64>(7)? != 0,
    })
}

fn storage_err(e: rusqlite::Error) -> Error {
    tracing::warn!("tool store fault: {}", e);
    Error::storage(e.to_string())
}
