pub mod config_store;
pub mod db;
pub mod error;
pub mod message_store;
pub mod types;
pub mod user_store;

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

pub use config_store::ConfigStore;
pub use message_store::MessageStore;
pub use user_store::UserStore;

use error::Result;

/// Opens the SQLite file, runs schema init, and wires up the three stores
/// that share the connection.
pub struct Store {
    pub config: ConfigStore,
    pub users: UserStore,
    pub messages: MessageStore,
}

impl Store {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        db::init_db(&conn)?;
        let db = Arc::new(Mutex::new(conn));
        Ok(Self {
            config: ConfigStore::new(db.clone()),
            users: UserStore::new(db.clone()),
            messages: MessageStore::new(db),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        db::init_db(&conn)?;
        let db = Arc::new(Mutex::new(conn));
        Ok(Self {
            config: ConfigStore::new(db.clone()),
            users: UserStore::new(db.clone()),
            messages: MessageStore::new(db),
        })
    }
}
