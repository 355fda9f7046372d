//! Inbox and blacklist boards: auto-provisioned singleton forum topics that
//! carry one card per user, linking back to that user's own topic.

use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ThreadId};

use relaybot_store::types::{User, UserInfoPatch};
use relaybot_store::Store;
use relaybot_telegram::TelegramClient;

use crate::error::Result;
use crate::locks::SoftLockMap;

#[derive(Clone, Copy)]
pub enum BoardKind {
    Inbox,
    Blacklist,
}

impl BoardKind {
    fn config_key(self) -> &'static str {
        match self {
            BoardKind::Inbox => "inbox_topic_id",
            BoardKind::Blacklist => "blacklist_topic_id",
        }
    }

    fn topic_name(self) -> &'static str {
        match self {
            BoardKind::Inbox => "Inbox",
            BoardKind::Blacklist => "Blacklist",
        }
    }
}

pub struct Board<'a> {
    kind: BoardKind,
    store: &'a Store,
    telegram: &'a TelegramClient,
    admin_group_id: ChatId,
    card_locks: SoftLockMap,
}

impl<'a> Board<'a> {
    pub fn new(kind: BoardKind, store: &'a Store, telegram: &'a TelegramClient, admin_group_id: ChatId) -> Self {
        Self {
            kind,
            store,
            telegram,
            admin_group_id,
            card_locks: SoftLockMap::new(relaybot_core::config::INBOX_LOCK_TTL_SECS),
        }
    }

    pub async fn ensure_topic(&self) -> Result<ThreadId> {
        let key = self.kind.config_key();
        let existing = self.store.config.get(key);
        if let Ok(id) = existing.parse::<i32>() {
            if id != 0 {
                return Ok(ThreadId(MessageId(id)));
            }
        }
        let thread_id = self
            .telegram
            .create_forum_topic(self.admin_group_id, self.kind.topic_name())
            .await?;
        self.store.config.set(key, &thread_id.0 .0.to_string())?;
        Ok(thread_id)
    }

    /// Post or refresh this user's card. Serialized per user so a burst of
    /// messages doesn't post duplicate cards for the same user. `preview`
    /// is the latest relayed message's text, shown truncated on inbox cards.
    pub async fn upsert_card(&self, user: &User, preview: Option<&str>) -> Result<()> {
        let lock_key = format!("{}:{}", self.kind.topic_name(), user.id);
        if !self.card_locks.try_acquire(&lock_key) {
            return Ok(());
        }
        let result = self.upsert_card_inner(user, preview).await;
        self.card_locks.release(&lock_key);
        result
    }

    async fn upsert_card_inner(&self, user: &User, preview: Option<&str>) -> Result<()> {
        let board_thread = self.ensure_topic().await?;
        let text = card_text(user, self.admin_group_id, preview);
        let existing_msg_id = match self.kind {
            BoardKind::Inbox => user.info.inbox_msg_id,
            BoardKind::Blacklist => user.info.blacklist_msg_id,
        };

        if let Some(msg_id) = existing_msg_id {
            self.telegram
                .edit_text(self.admin_group_id, MessageId(msg_id), &text)
                .await?;
            return Ok(());
        }

        let posted = self
            .telegram
            .send_text_with_keyboard(self.admin_group_id, Some(board_thread), &text, card_keyboard(self.kind, &user.id))
            .await?;

        let patch = match self.kind {
            BoardKind::Inbox => UserInfoPatch {
                inbox_msg_id: Some(Some(posted.0)),
                ..Default::default()
            },
            BoardKind::Blacklist => UserInfoPatch {
                blacklist_msg_id: Some(Some(posted.0)),
                ..Default::default()
            },
        };
        self.store.users.patch_info(&user.id, patch)?;
        Ok(())
    }

    pub async fn remove_card(&self, user: &User) -> Result<()> {
        let existing_msg_id = match self.kind {
            BoardKind::Inbox => user.info.inbox_msg_id,
            BoardKind::Blacklist => user.info.blacklist_msg_id,
        };
        if let Some(msg_id) = existing_msg_id {
            self.telegram
                .delete_message(self.admin_group_id, MessageId(msg_id))
                .await?;
            let patch = match self.kind {
                BoardKind::Inbox => UserInfoPatch {
                    inbox_msg_id: Some(None),
                    ..Default::default()
                },
                BoardKind::Blacklist => UserInfoPatch {
                    blacklist_msg_id: Some(None),
                    ..Default::default()
                },
            };
            self.store.users.patch_info(&user.id, patch)?;
        }
        Ok(())
    }
}

/// Inbox cards get an "Acknowledge" button that just removes the card;
/// blacklist cards get an "Unblock" button that reuses the same callback
/// the user's own pinned info card exposes, so there is one unblock path.
fn card_keyboard(kind: BoardKind, user_id: &str) -> InlineKeyboardMarkup {
    let button = match kind {
        BoardKind::Inbox => InlineKeyboardButton::callback("Acknowledge", format!("board:ack:{user_id}")),
        BoardKind::Blacklist => InlineKeyboardButton::callback("Unblock", format!("card:unblock:{user_id}")),
    };
    InlineKeyboardMarkup::new(vec![vec![button]])
}

const CARD_PREVIEW_LEN: usize = 20;

fn card_text(user: &User, admin_group_id: ChatId, preview: Option<&str>) -> String {
    let name = if user.info.display_name.is_empty() {
        "(no name)".to_string()
    } else {
        user.info.display_name.clone()
    };
    let preview_line = preview
        .map(|p| {
            let truncated: String = p.chars().take(CARD_PREVIEW_LEN).collect();
            format!("\n{truncated}")
        })
        .unwrap_or_default();
    match user.topic_id {
        Some(topic_id) => format!(
            "{name}\nuser_id: {}\n{}{preview_line}",
            user.id,
            jump_to_thread_url(admin_group_id, topic_id)
        ),
        None => format!("{name}\nuser_id: {}\n(no topic yet){preview_line}", user.id),
    }
}

/// Deep-link to a forum topic: Telegram drops the `-100` supergroup prefix
/// in `t.me/c/<id>/<thread>` URLs.
pub fn jump_to_thread_url(admin_group_id: ChatId, topic_id: i64) -> String {
    let raw = admin_group_id.0.to_string();
    let stripped = raw.strip_prefix("-100").unwrap_or(&raw);
    format!("https://t.me/c/{stripped}/{topic_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_url_strips_supergroup_prefix() {
        let url = jump_to_thread_url(ChatId(-1001234567890), 42);
        assert_eq!(url, "https://t.me/c/1234567890/42");
    }

    #[test]
    fn jump_url_leaves_non_supergroup_ids_alone() {
        let url = jump_to_thread_url(ChatId(12345), 42);
        assert_eq!(url, "https://t.me/c/12345/42");
    }

    #[test]
    fn inbox_card_keyboard_acknowledges() {
        let markup = card_keyboard(BoardKind::Inbox, "7");
        let data = &markup.inline_keyboard[0][0].text;
        assert_eq!(data, "Acknowledge");
    }

    #[test]
    fn blacklist_card_keyboard_reuses_the_unblock_callback() {
        let markup = card_keyboard(BoardKind::Blacklist, "7");
        assert_eq!(markup.inline_keyboard[0][0].text, "Unblock");
    }

    #[test]
    fn card_text_without_topic_says_so() {
        let user = User::new("7");
        let text = card_text(&user, ChatId(-1009999), None);
        assert!(text.contains("no topic yet"));
    }

    #[test]
    fn card_text_truncates_preview_to_twenty_chars() {
        let user = User::new("7");
        let long_message = "a".repeat(40);
        let text = card_text(&user, ChatId(-1009999), Some(&long_message));
        assert!(text.ends_with(&"a".repeat(20)));
        assert!(!text.ends_with(&"a".repeat(21)));
    }
}
