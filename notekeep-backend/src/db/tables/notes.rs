//! Note CRUD, full-text search and count.
//!
//! Writes only ever touch `notes`; the triggers installed by the schema keep
//! `notes_fts` in step inside the same statement.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{OptionalExtension, params};

use super::super::error::{NoteError, NoteResult, StorageError};
use super::super::fts;
use super::super::Database;
use crate::models::{NewNote, Note, NoteColor, UpdateNoteRequest};

const NOTE_COLUMNS: &str = "id, title, content, color, created_at, updated_at";

/// The stored `updated_at` plus one microsecond, in the same fixed-width text
/// form. Characters 21-26 hold the microseconds; a full second rolls over.
const NEXT_UPDATED_AT: &str = "CASE
    WHEN CAST(substr(updated_at, 21, 6) AS INTEGER) < 999999
    THEN substr(updated_at, 1, 20)
         || printf('%06d', CAST(substr(updated_at, 21, 6) AS INTEGER) + 1) || 'Z'
    ELSE strftime('%Y-%m-%dT%H:%M:%S', substr(updated_at, 1, 19), '+1 second') || '.000000Z'
END";

impl Database {
    /// Insert a note, assigning id, default color and timestamps
    pub fn create_note(&self, new: &NewNote) -> NoteResult<Note> {
        let conn = self.conn()?;
        let now = now();
        let created_at = new.created_at.map(|t| t.trunc_subsecs(6)).unwrap_or(now);
        let updated_at = new
            .updated_at
            .map(|t| t.trunc_subsecs(6))
            .unwrap_or(now)
            .max(created_at);
        let color = new.resolved_color();

        conn.execute(
            "INSERT INTO notes (title, content, color, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new.title,
                new.content,
                color.as_str(),
                format_timestamp(&created_at),
                format_timestamp(&updated_at),
            ],
        )?;

        let id = conn.last_insert_rowid();
        log::debug!("[NOTES] Created note {}", id);

        Ok(Note {
            id,
            title: new.title.clone(),
            content: new.content.clone(),
            color,
            created_at,
            updated_at,
        })
    }

    /// All notes, most recently updated first
    pub fn list_notes(&self) -> NoteResult<Vec<Note>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notes ORDER BY updated_at DESC, id DESC",
            NOTE_COLUMNS
        ))?;

        let notes = stmt
            .query_map([], Self::row_to_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    pub fn get_note(&self, id: i64) -> NoteResult<Note> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS),
            [id],
            Self::row_to_note,
        )
        .optional()?
        .ok_or(NoteError::NotFound(id))
    }

    /// Apply a partial update and return the stored row.
    ///
    /// Blank title/content and unknown colors keep their current values.
    /// `updated_at` becomes the current time, but never less than `created_at`
    /// and always later than its previous value, even when that value lies in
    /// the future. No row returned means no such id.
    pub fn update_note(&self, id: i64, changes: &UpdateNoteRequest) -> NoteResult<Note> {
        let conn = self.conn()?;
        let now = format_timestamp(&now());

        let note = conn
            .query_row(
                &format!(
                    "UPDATE notes
                     SET title = COALESCE(?1, title),
                         content = COALESCE(?2, content),
                         color = COALESCE(?3, color),
                         updated_at = MAX(?4, created_at, {})
                     WHERE id = ?5
                     RETURNING {}",
                    NEXT_UPDATED_AT, NOTE_COLUMNS
                ),
                params![
                    changes.title_change(),
                    changes.content_change(),
                    changes.color_change().map(|c| c.as_str().to_string()),
                    now,
                    id,
                ],
                Self::row_to_note,
            )
            .optional()?
            .ok_or(NoteError::NotFound(id))?;

        log::debug!("[NOTES] Updated note {}", id);
        Ok(note)
    }

    pub fn delete_note(&self, id: i64) -> NoteResult<()> {
        let conn = self.conn()?;
        let rows_affected = conn.execute("DELETE FROM notes WHERE id = ?1", [id])?;
        if rows_affected == 0 {
            return Err(NoteError::NotFound(id));
        }
        log::debug!("[NOTES] Deleted note {}", id);
        Ok(())
    }

    /// Full-text search over title and content, best match first.
    /// A blank query lists every note; one with nothing searchable in it
    /// (only punctuation) matches none.
    pub fn search_notes(&self, query: &str) -> NoteResult<Vec<Note>> {
        if query.trim().is_empty() {
            return self.list_notes();
        }
        let expr = match fts::match_expression(query) {
            Some(expr) => expr,
            None => return Ok(Vec::new()),
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT n.id, n.title, n.content, n.color, n.created_at, n.updated_at,
                    bm25(notes_fts) AS score
             FROM notes_fts
             JOIN notes n ON n.id = notes_fts.rowid
             WHERE notes_fts MATCH ?1
             ORDER BY score, n.id",
        )?;

        let notes = stmt
            .query_map([&expr], Self::row_to_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        log::debug!("[NOTES] Search {:?} matched {} notes", query, notes.len());
        Ok(notes)
    }

    pub fn count_notes(&self) -> NoteResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Regenerate the whole search index from the notes table
    pub fn rebuild_search_index(&self) -> NoteResult<()> {
        let conn = self.conn()?;
        conn.execute("INSERT INTO notes_fts(notes_fts) VALUES ('rebuild')", [])?;
        log::info!("[NOTES] Rebuilt search index");
        Ok(())
    }

    /// Verify the search index matches the notes table
    pub fn check_search_index(&self) -> NoteResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO notes_fts(notes_fts, rank) VALUES ('integrity-check', 1)",
            [],
        )
        .map_err(|e| StorageError::SearchIndex(e.to_string()))?;
        Ok(())
    }

    fn row_to_note(row: &rusqlite::Row) -> rusqlite::Result<Note> {
        let color_str: String = row.get(3)?;

        Ok(Note {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            color: NoteColor::from_str_or_default(&color_str),
            created_at: parse_timestamp(row, 4)?,
            updated_at: parse_timestamp(row, 5)?,
        })
    }
}

/// Current time at the precision timestamps are stored with
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so text order equals time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(StorageError::Timestamp { value, source }),
            )
        })
}
