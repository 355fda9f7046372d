//! User admission, binding and moderation state.

use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use relaybot_core::types::UserState;

use crate::error::{Result, StoreError};
use crate::types::{User, UserInfo, UserInfoPatch};

pub struct UserStore {
    db: Arc<Mutex<Connection>>,
}

impl UserStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub fn get(&self, user_id: &str) -> Result<Option<User>> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT user_id, user_state, is_blocked, block_count, topic_id, user_info_json,
                    created_at, updated_at
             FROM users WHERE user_id = ?1",
            params![user_id],
            row_to_user,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn require(&self, user_id: &str) -> Result<User> {
        self.get(user_id)?
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))
    }

    /// Insert a fresh `new`-state user row, or return the existing one untouched.
    pub fn get_or_create(&self, user_id: &str) -> Result<User> {
        if let Some(user) = self.get(user_id)? {
            return Ok(user);
        }
        let user = User::new(user_id);
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO users (user_id, user_state, is_blocked, block_count, topic_id, user_info_json,
                                 created_at, updated_at)
             VALUES (?1, ?2, 0, 0, NULL, ?3, ?4, ?4)
             ON CONFLICT(user_id) DO NOTHING",
            params![
                user.id,
                user.state.to_string(),
                serde_json::to_string(&user.info)?,
                user.created_at
            ],
        )?;
        drop(db);
        // Another writer may have raced us; re-read to return the row that won.
        self.get(user_id)?
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))
    }

    pub fn set_state(&self, user_id: &str, state: UserState) -> Result<()> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE users SET user_state = ?2, updated_at = ?3 WHERE user_id = ?1",
            params![user_id, state.to_string(), now()],
        )?;
        if changed == 0 {
            return Err(StoreError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    pub fn set_topic(&self, user_id: &str, topic_id: i64) -> Result<()> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE users SET topic_id = ?2, updated_at = ?3 WHERE user_id = ?1",
            params![user_id, topic_id, now()],
        )?;
        if changed == 0 {
            return Err(StoreError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    /// Forget a user's topic binding, e.g. after Telegram reports the topic gone.
    pub fn clear_topic(&self, user_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE users SET topic_id = NULL, updated_at = ?2 WHERE user_id = ?1",
            params![user_id, now()],
        )?;
        if changed == 0 {
            return Err(StoreError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    /// Apply a patch to `info` in place, read-modify-write under the row lock.
    pub fn patch_info(&self, user_id: &str, patch: UserInfoPatch) -> Result<UserInfo> {
        let db = self.db.lock().unwrap();
        let raw: String = db.query_row(
            "SELECT user_info_json FROM users WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))?;
        let mut info: UserInfo = serde_json::from_str(&raw)?;
        info.merge(patch);
        let updated = serde_json::to_string(&info)?;
        db.execute(
            "UPDATE users SET user_info_json = ?2, updated_at = ?3 WHERE user_id = ?1",
            params![user_id, updated, now()],
        )?;
        Ok(info)
    }

    pub fn set_blocked(&self, user_id: &str, blocked: bool) -> Result<()> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE users SET is_blocked = ?2, updated_at = ?3 WHERE user_id = ?1",
            params![user_id, blocked as i64, now()],
        )?;
        if changed == 0 {
            return Err(StoreError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    /// Bump the violation counter and report whether it now meets `threshold`.
    pub fn record_violation(&self, user_id: &str, threshold: i64) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let count: i64 = db.query_row(
            "UPDATE users SET block_count = block_count + 1, updated_at = ?2 WHERE user_id = ?1
             RETURNING block_count",
            params![user_id, now()],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))?;
        Ok(count >= threshold)
    }

    pub fn reset_violations(&self, user_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE users SET block_count = 0, updated_at = ?2 WHERE user_id = ?1",
            params![user_id, now()],
        )?;
        if changed == 0 {
            return Err(StoreError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    pub fn find_by_topic(&self, topic_id: i64) -> Result<Option<User>> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT user_id, user_state, is_blocked, block_count, topic_id, user_info_json,
                    created_at, updated_at
             FROM users WHERE topic_id = ?1",
            params![topic_id],
            row_to_user,
        )
        .optional()
        .map_err(StoreError::from)
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let state_str: String = row.get(1)?;
    let info_json: String = row.get(5)?;
    let info: UserInfo = serde_json::from_str(&info_json).unwrap_or_default();
    Ok(User {
        id: row.get(0)?,
        state: state_str.parse().unwrap_or_default(),
        is_blocked: row.get::<_, i64>(2)? != 0,
        block_count: row.get(3)?,
        topic_id: row.get(4)?,
        info,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> UserStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        UserStore::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let store = store();
        let a = store.get_or_create("1").unwrap();
        store.set_state("1", UserState::Verified).unwrap();
        let b = store.get_or_create("1").unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.state, UserState::Verified);
    }

    #[test]
    fn set_topic_then_find_by_topic_roundtrips() {
        let store = store();
        store.get_or_create("1").unwrap();
        store.set_topic("1", 77).unwrap();
        let found = store.find_by_topic(77).unwrap().unwrap();
        assert_eq!(found.id, "1");
    }

    #[test]
    fn record_violation_reports_threshold_crossing() {
        let store = store();
        store.get_or_create("1").unwrap();
        assert!(!store.record_violation("1", 3).unwrap());
        assert!(!store.record_violation("1", 3).unwrap());
        assert!(store.record_violation("1", 3).unwrap());
    }

    #[test]
    fn reset_violations_zeroes_the_counter() {
        let store = store();
        store.get_or_create("1").unwrap();
        store.record_violation("1", 100).unwrap();
        store.reset_violations("1").unwrap();
        let user = store.require("1").unwrap();
        assert_eq!(user.block_count, 0);
    }

    #[test]
    fn patch_info_merges_without_clobbering() {
        let store = store();
        store.get_or_create("1").unwrap();
        store
            .patch_info(
                "1",
                UserInfoPatch {
                    display_name: Some("Alice".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let info = store
            .patch_info(
                "1",
                UserInfoPatch {
                    note: Some(Some("vip".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(info.display_name, "Alice");
        assert_eq!(info.note.as_deref(), Some("vip"));
    }

    #[test]
    fn clear_topic_unsets_the_binding() {
        let store = store();
        store.get_or_create("1").unwrap();
        store.set_topic("1", 77).unwrap();
        store.clear_topic("1").unwrap();
        let user = store.require("1").unwrap();
        assert_eq!(user.topic_id, None);
    }

    #[test]
    fn missing_user_operations_error() {
        let store = store();
        assert!(store.set_state("ghost", UserState::Verified).is_err());
        assert!(store.record_violation("ghost", 1).is_err());
    }
}
