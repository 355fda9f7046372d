//! Relayed-message log, used to diff later edits against what was last sent.

use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::types::MessageRecord;

/// Telegram's own message-length ceiling; keeps the table bounded per row.
const TEXT_MAX_LEN: usize = 4096;

pub struct MessageStore {
    db: Arc<Mutex<Connection>>,
}

impl MessageStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub fn insert(&self, record: &MessageRecord) -> Result<()> {
        let text = record
            .text
            .as_deref()
            .map(|t| t.chars().take(TEXT_MAX_LEN).collect::<String>());
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO messages (user_id, message_id, text, date) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, message_id) DO UPDATE SET text = excluded.text, date = excluded.date",
            params![record.user_id, record.message_id, text, record.date],
        )?;
        Ok(())
    }

    pub fn get(&self, user_id: &str, message_id: i64) -> Result<Option<MessageRecord>> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT user_id, message_id, text, date FROM messages
             WHERE user_id = ?1 AND message_id = ?2",
            params![user_id, message_id],
            |row| {
                Ok(MessageRecord {
                    user_id: row.get(0)?,
                    message_id: row.get(1)?,
                    text: row.get(2)?,
                    date: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MessageStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        MessageStore::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn insert_then_get_roundtrips() {
        let store = store();
        store
            .insert(&MessageRecord {
                user_id: "1".into(),
                message_id: 10,
                text: Some("hello".into()),
                date: 1000,
            })
            .unwrap();
        let found = store.get("1", 10).unwrap().unwrap();
        assert_eq!(found.text.as_deref(), Some("hello"));
    }

    #[test]
    fn insert_truncates_text_to_telegram_message_ceiling() {
        let store = store();
        let long_text = "a".repeat(5000);
        store
            .insert(&MessageRecord {
                user_id: "1".into(),
                message_id: 10,
                text: Some(long_text),
                date: 1000,
            })
            .unwrap();
        let found = store.get("1", 10).unwrap().unwrap();
        assert_eq!(found.text.unwrap().chars().count(), TEXT_MAX_LEN);
    }

    #[test]
    fn insert_twice_overwrites_text() {
        let store = store();
        let mut record = MessageRecord {
            user_id: "1".into(),
            message_id: 10,
            text: Some("hello".into()),
            date: 1000,
        };
        store.insert(&record).unwrap();
        record.text = Some("hello edited".into());
        record.date = 1001;
        store.insert(&record).unwrap();
        let found = store.get("1", 10).unwrap().unwrap();
        assert_eq!(found.text.as_deref(), Some("hello edited"));
        assert_eq!(found.date, 1001);
    }

    #[test]
    fn get_missing_returns_none() {
        let store = store();
        assert!(store.get("1", 999).unwrap().is_none());
    }
}
