#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("store error: {0}")]
    Store(#[from] relaybot_store::error::StoreError),

    #[error("telegram error: {0}")]
    Telegram(#[from] relaybot_telegram::error::TelegramError),

    #[error("user not yet bound to a topic")]
    NotBound,
}

pub type Result<T> = std::result::Result<T, RelayError>;
