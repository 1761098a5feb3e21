//! 会话状态持久化（SQLite）
//!
//! 整个 SharedState 序列化为单个 JSON blob，按 (user_id, goal_id) 做 upsert，
//! 后写覆盖先写。每次 ingest 后整体落盘，启动时若有记录则整体恢复。

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::core::error::SessionError;
use crate::core::state::SharedState;

pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    pub fn open(path: &Path) -> Result<Self, SessionError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SessionError::Persistence(rusqlite::Error::InvalidPath(
                        format!("{}: {}", parent.display(), e).into(),
                    ))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                user_id    TEXT NOT NULL,
                goal_id    TEXT NOT NULL,
                state      TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, goal_id)
            );",
        )?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, SessionError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                user_id    TEXT NOT NULL,
                goal_id    TEXT NOT NULL,
                state      TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, goal_id)
            );",
        )?;
        Ok(Self { conn })
    }

    /// 整体落盘，后写覆盖先写
    pub fn save(&self, user_id: &str, state: &SharedState) -> Result<(), SessionError> {
        let blob = serde_json::to_string(state)?;
        self.conn.execute(
            "INSERT INTO sessions (user_id, goal_id, state, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, goal_id)
             DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
            params![
                user_id,
                state.goal.id,
                blob,
                state.last_updated_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn load(&self, user_id: &str, goal_id: &str) -> Result<Option<SharedState>, SessionError> {
        let blob: Option<String> = self
            .conn
            .query_row(
                "SELECT state FROM sessions WHERE user_id = ?1 AND goal_id = ?2",
                params![user_id, goal_id],
                |row| row.get(0),
            )
            .optional()?;
        match blob {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{LearningGoal, Phase};

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(&dir.path().join("mentor.sqlite3")).unwrap();

        let mut state = SharedState::new(LearningGoal::new("goal-1", "Rust ownership"));
        state.phase = Some(Phase::Intake);
        store.save("user-1", &state).unwrap();

        let loaded = store.load("user-1", "goal-1").unwrap().unwrap();
        assert_eq!(loaded.goal.title, "Rust ownership");
        assert_eq!(loaded.phase, Some(Phase::Intake));
        assert!(store.load("user-1", "goal-2").unwrap().is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let store = SessionStore::open_in_memory().unwrap();
        let mut state = SharedState::new(LearningGoal::new("goal-1", "First"));
        store.save("user-1", &state).unwrap();

        state.phase = Some(Phase::Learning);
        store.save("user-1", &state).unwrap();

        let loaded = store.load("user-1", "goal-1").unwrap().unwrap();
        assert_eq!(loaded.phase, Some(Phase::Learning));
    }
}
