use rusqlite::Connection;

use crate::error::Result;

/// Initialise the config/users/messages tables. Idempotent — safe to
/// call on every boot.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_config_table(conn)?;
    create_users_table(conn)?;
    create_messages_table(conn)?;
    Ok(())
}

fn create_config_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS config (
            key   TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn create_users_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            user_id        TEXT PRIMARY KEY NOT NULL,
            user_state     TEXT NOT NULL DEFAULT 'new',
            is_blocked     INTEGER NOT NULL DEFAULT 0,
            block_count    INTEGER NOT NULL DEFAULT 0,
            topic_id       INTEGER,
            user_info_json TEXT NOT NULL DEFAULT '{}',
            created_at     TEXT NOT NULL DEFAULT '',
            updated_at     TEXT NOT NULL DEFAULT ''
        );",
    )?;
    Ok(())
}

fn create_messages_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
            user_id    TEXT NOT NULL,
            message_id INTEGER NOT NULL,
            text       TEXT,
            date       INTEGER NOT NULL,
            PRIMARY KEY (user_id, message_id)
        );",
    )?;
    Ok(())
}
