/// Errors produced by the Telegram client.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("teloxide error: {0}")]
    Teloxide(#[from] teloxide::RequestError),

    #[error("no bot token configured")]
    NoToken,
}

impl TelegramError {
    /// True when the platform's textual reason indicates the bound forum
    /// topic was deleted or closed out from under us — the caller should
    /// forget the binding and create a replacement topic.
    pub fn is_topic_lost(&self) -> bool {
        let msg = self.to_string().to_ascii_lowercase();
        msg.contains("thread not found")
            || msg.contains("topic_deleted")
            || msg.contains("topic closed")
            || msg.contains("message thread not found")
    }
}

pub type Result<T> = std::result::Result<T, TelegramError>;
