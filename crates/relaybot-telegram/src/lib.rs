pub mod client;
pub mod error;
pub mod send;

pub use client::TelegramClient;
pub use error::TelegramError;
