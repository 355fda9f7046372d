#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("store error: {0}")]
    Store(#[from] relaybot_store::error::StoreError),

    #[error("telegram error: {0}")]
    Telegram(#[from] relaybot_telegram::error::TelegramError),

    #[error("relay error: {0}")]
    Relay(#[from] relaybot_relay::RelayError),

    #[error("not an authorized admin")]
    NotAuthorized,

    #[error("malformed callback data: {0}")]
    BadCallback(String),
}

pub type Result<T> = std::result::Result<T, AdminError>;
