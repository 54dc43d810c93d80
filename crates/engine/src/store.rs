use anyhow::Context;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(i64::MAX)
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Encoded boards by name, with an append-only event log of saves.
#[derive(Debug, Clone)]
pub struct BoardStore {
    db_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBoard {
    pub name: String,
    pub state: String,
    pub updated_at: String,
    pub rev: i64,
}

impl BoardStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn open(&self) -> anyhow::Result<Connection> {
        let path = self.db_path.clone();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create db dir: {}", dir.display()))?;
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("open sqlite db: {}", path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        migrate(&conn)?;
        Ok(conn)
    }

    /// Upserts the encoded state for `name` and returns its new revision.
    pub fn save(&self, name: &str, state: &str) -> anyhow::Result<i64> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        let ts = now_rfc3339();
        tx.execute(
            "INSERT INTO boards (name, state, updated_at, rev) VALUES (?1, ?2, ?3, 1)
             ON CONFLICT(name) DO UPDATE SET state = excluded.state,
                                             updated_at = excluded.updated_at,
                                             rev = boards.rev + 1",
            (name, state, &ts),
        )?;
        let rev: i64 = tx.query_row("SELECT rev FROM boards WHERE name = ?1", [name], |row| {
            row.get(0)
        })?;
        append_event_tx(
            &tx,
            "board.saved",
            name,
            serde_json::json!({ "rev": rev, "items": count_items(state) }),
        )?;
        tx.commit()?;
        Ok(rev)
    }

    pub fn load(&self, name: &str) -> anyhow::Result<Option<StoredBoard>> {
        let conn = self.open()?;
        let board = conn
            .query_row(
                "SELECT name, state, updated_at, rev FROM boards WHERE name = ?1",
                [name],
                |row| {
                    Ok(StoredBoard {
                        name: row.get(0)?,
                        state: row.get(1)?,
                        updated_at: row.get(2)?,
                        rev: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(board)
    }

    pub fn get_rev(&self) -> anyhow::Result<i64> {
        let conn = self.open()?;
        let rev: Option<i64> =
            conn.query_row("SELECT MAX(seq) FROM event_log", [], |row| row.get(0))?;
        Ok(rev.unwrap_or(0))
    }
}

fn count_items(state: &str) -> usize {
    if state.is_empty() {
        0
    } else {
        state.split(crate::codec::ITEM_SEPARATOR).count()
    }
}

fn migrate(conn: &Connection) -> anyhow::Result<()> {
    let v: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if v < 1 {
        conn.execute_batch(
            r#"
CREATE TABLE IF NOT EXISTS boards (
  name TEXT PRIMARY KEY,
  state TEXT NOT NULL DEFAULT '',
  updated_at TEXT NOT NULL,
  rev INTEGER NOT NULL DEFAULT 0
);

-- Monotonic revision source for clients polling for changes.
CREATE TABLE IF NOT EXISTS event_log (
  seq INTEGER PRIMARY KEY AUTOINCREMENT,
  ts_ms INTEGER NOT NULL,
  kind TEXT NOT NULL,
  board TEXT,
  payload_json TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_event_log_board ON event_log(board);
"#,
        )?;

        conn.pragma_update(None, "user_version", 1_i64)?;
    }

    Ok(())
}

fn append_event_tx(
    tx: &rusqlite::Transaction<'_>,
    kind: &str,
    board: &str,
    payload: serde_json::Value,
) -> anyhow::Result<i64> {
    let ts = now_ms();
    let payload_json = payload.to_string();
    tx.execute(
        "INSERT INTO event_log (ts_ms, kind, board, payload_json) VALUES (?1, ?2, ?3, ?4)",
        (ts, kind, board, payload_json),
    )?;
    Ok(tx.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> BoardStore {
        let p = std::env::temp_dir().join(format!(
            "idolboard-store-test-{tag}-{}.db",
            OffsetDateTime::now_utc().unix_timestamp_nanos()
        ));
        BoardStore::new(p)
    }

    #[test]
    fn save_then_load_bumps_rev() {
        let store = temp_store("rev");
        assert_eq!(store.load("main").unwrap(), None);
        assert_eq!(store.save("main", "11/1/0/0/0/0").unwrap(), 1);
        assert_eq!(store.save("main", "12/1/0/0/0/0").unwrap(), 2);
        let board = store.load("main").unwrap().expect("stored");
        assert_eq!(board.state, "12/1/0/0/0/0");
        assert_eq!(board.rev, 2);
        assert_eq!(store.get_rev().unwrap(), 2);
    }

    #[test]
    fn boards_are_independent() {
        let store = temp_store("names");
        store.save("a", "").unwrap();
        store.save("b", "11/1/0/0/0/0;12/1/0/0/0/0").unwrap();
        assert_eq!(store.load("a").unwrap().unwrap().state, "");
        assert_eq!(store.load("a").unwrap().unwrap().rev, 1);
        assert_eq!(store.load("b").unwrap().unwrap().rev, 1);
        assert_eq!(store.get_rev().unwrap(), 2);

        let conn = store.open().unwrap();
        let items: String = conn
            .query_row(
                "SELECT payload_json FROM event_log WHERE board = 'b'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert!(items.contains("\"items\":2"));
    }
}
