//! SQLite schema for the note store: the `notes` table, its FTS5 index and
//! the triggers that keep the two in step.

use rusqlite::Connection;

use super::error::{NoteResult, StorageError};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Every object created by `SCHEMA_SQL`, in creation order
pub const SCHEMA_OBJECTS: [&str; 7] = [
    "notes",
    "idx_notes_created_at",
    "idx_notes_updated_at",
    "notes_fts",
    "notes_ai",
    "notes_ad",
    "notes_au",
];

const SCHEMA_SQL: &str = r#"
-- AUTOINCREMENT keeps deleted ids from being handed out again
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    color TEXT NOT NULL DEFAULT 'white'
        CHECK (color IN ('white', 'yellow', 'orange', 'pink', 'purple', 'blue', 'green', 'gray')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (updated_at >= created_at)
);
CREATE INDEX IF NOT EXISTS idx_notes_created_at ON notes(created_at);
CREATE INDEX IF NOT EXISTS idx_notes_updated_at ON notes(updated_at);

-- External-content index: rows live only in `notes`
CREATE VIRTUAL TABLE IF NOT EXISTS notes_fts USING fts5(
    title,
    content,
    content='notes',
    content_rowid='id',
    tokenize='porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS notes_ai AFTER INSERT ON notes
BEGIN
    INSERT INTO notes_fts(rowid, title, content)
    VALUES (new.id, new.title, new.content);
END;

CREATE TRIGGER IF NOT EXISTS notes_ad AFTER DELETE ON notes
BEGIN
    INSERT INTO notes_fts(notes_fts, rowid, title, content)
    VALUES ('delete', old.id, old.title, old.content);
END;

CREATE TRIGGER IF NOT EXISTS notes_au AFTER UPDATE ON notes
BEGIN
    INSERT INTO notes_fts(notes_fts, rowid, title, content)
    VALUES ('delete', old.id, old.title, old.content);
    INSERT INTO notes_fts(rowid, title, content)
    VALUES (new.id, new.title, new.content);
END;
"#;

/// What `ensure_schema` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOutcome {
    /// Schema was already at the current version
    Current,
    /// Objects were created or upgraded from the given version
    Migrated { from: i32 },
}

pub fn schema_version(conn: &Connection) -> rusqlite::Result<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Create whatever part of the schema is missing and stamp the version.
///
/// Safe to run on every startup. A database written by a newer build is left
/// untouched and reported as a storage failure.
pub fn ensure_schema(conn: &mut Connection) -> NoteResult<SchemaOutcome> {
    let found = schema_version(conn)?;
    if found > CURRENT_SCHEMA_VERSION {
        return Err(StorageError::UnsupportedSchema {
            found,
            supported: CURRENT_SCHEMA_VERSION,
        }
        .into());
    }

    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA_SQL)?;

    // IF NOT EXISTS skips a name already taken by an object of another kind
    let present = schema_objects(&tx)?;
    if let Some(missing) = SCHEMA_OBJECTS.iter().find(|name| !present.iter().any(|p| p == *name)) {
        return Err(StorageError::MissingSchemaObject(missing.to_string()).into());
    }

    let outcome = if found < CURRENT_SCHEMA_VERSION {
        // Rows written before the index existed must be indexed too
        tx.execute("INSERT INTO notes_fts(notes_fts) VALUES ('rebuild')", [])?;
        tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
        SchemaOutcome::Migrated { from: found }
    } else {
        SchemaOutcome::Current
    };
    tx.commit()?;

    if let SchemaOutcome::Migrated { from } = outcome {
        log::info!(
            "Database schema updated from version {} to {}",
            from,
            CURRENT_SCHEMA_VERSION
        );
    }
    Ok(outcome)
}

/// Names of the schema objects present in the database, sorted
pub fn schema_objects(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type IN ('table', 'index', 'trigger') AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_objects(conn: &Connection, name: &str) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE name = ?1",
            [name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_fresh_database_is_migrated() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);

        let outcome = ensure_schema(&mut conn).unwrap();
        assert_eq!(outcome, SchemaOutcome::Migrated { from: 0 });
        assert_eq!(schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);

        let objects = schema_objects(&conn).unwrap();
        for name in SCHEMA_OBJECTS {
            assert!(objects.iter().any(|o| o == name), "missing {}", name);
        }
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        ensure_schema(&mut conn).unwrap();
        let before = schema_objects(&conn).unwrap();

        let outcome = ensure_schema(&mut conn).unwrap();
        assert_eq!(outcome, SchemaOutcome::Current);
        assert_eq!(schema_objects(&conn).unwrap(), before);

        for name in SCHEMA_OBJECTS {
            assert_eq!(count_objects(&conn, name), 1, "duplicate {}", name);
        }
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION + 1)
            .unwrap();

        let err = ensure_schema(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            crate::db::NoteError::Storage(StorageError::UnsupportedSchema { .. })
        ));
        assert_eq!(count_objects(&conn, "notes"), 0);
    }

    #[test]
    fn test_conflicting_object_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE VIEW notes_fts AS SELECT 1 AS title, 2 AS content;")
            .unwrap();

        let err = ensure_schema(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            crate::db::NoteError::Storage(StorageError::MissingSchemaObject(ref name)) if name == "notes_fts"
        ));
        assert_eq!(schema_version(&conn).unwrap(), 0);
        assert_eq!(count_objects(&conn, "notes"), 0);
    }

    #[test]
    fn test_pre_index_rows_are_indexed_on_upgrade() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                color TEXT NOT NULL DEFAULT 'white',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            INSERT INTO notes (title, content, created_at, updated_at)
            VALUES ('Legacy', 'written before the index', '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z');",
        )
        .unwrap();

        ensure_schema(&mut conn).unwrap();

        let hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM notes_fts WHERE notes_fts MATCH 'legacy'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_triggers_mirror_mutations() {
        let mut conn = Connection::open_in_memory().unwrap();
        ensure_schema(&mut conn).unwrap();
        let ts = "2024-01-01T00:00:00.000000Z";

        conn.execute(
            "INSERT INTO notes (title, content, created_at, updated_at) VALUES ('alpha', 'first body', ?1, ?1)",
            [ts],
        )
        .unwrap();
        let matches = |conn: &Connection, term: &str| -> i64 {
            conn.query_row(
                "SELECT COUNT(*) FROM notes_fts WHERE notes_fts MATCH ?1",
                [term],
                |row| row.get(0),
            )
            .unwrap()
        };
        assert_eq!(matches(&conn, "alpha"), 1);

        conn.execute("UPDATE notes SET title = 'beta' WHERE id = 1", [])
            .unwrap();
        assert_eq!(matches(&conn, "alpha"), 0);
        assert_eq!(matches(&conn, "beta"), 1);

        conn.execute("DELETE FROM notes WHERE id = 1", []).unwrap();
        assert_eq!(matches(&conn, "beta"), 0);
        assert_eq!(matches(&conn, "body"), 0);
    }
}
