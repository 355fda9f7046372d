//! Relay engine: binds each user to a forum topic in the admin group and
//! moves messages across that binding in both directions.

use std::time::Duration;

use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ThreadId};
use tracing::{info, warn};

use relaybot_core::config::TOPIC_NAME_MAX_LEN;
use relaybot_store::Store;
use relaybot_telegram::TelegramClient;

use crate::error::{RelayError, Result};
use crate::locks::SoftLockMap;

const TOPIC_CREATE_RETRY_DELAY_MS: u64 = 150;
const TOPIC_CREATE_RETRY_ATTEMPTS: u32 = 10;

/// The block/unblock/note/pin control row shown under a user's info card.
/// Parsed on the other end by the admin console's `card:` callback handler.
fn card_keyboard(user_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("Block", format!("card:block:{user_id}")),
            InlineKeyboardButton::callback("Unblock", format!("card:unblock:{user_id}")),
        ],
        vec![
            InlineKeyboardButton::callback("Note", format!("card:note:{user_id}")),
            InlineKeyboardButton::callback("Pin", format!("card:pin:{user_id}")),
        ],
    ])
}

pub struct RelayEngine {
    store: Store,
    telegram: TelegramClient,
    admin_group_id: ChatId,
    topic_locks: SoftLockMap,
}

impl RelayEngine {
    pub fn new(store: Store, telegram: TelegramClient, admin_group_id: i64) -> Self {
        Self {
            store,
            telegram,
            admin_group_id: ChatId(admin_group_id),
            topic_locks: SoftLockMap::new(relaybot_core::config::TOPIC_CREATE_LOCK_TTL_SECS),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn telegram(&self) -> &TelegramClient {
        &self.telegram
    }

    pub fn admin_group_id(&self) -> ChatId {
        self.admin_group_id
    }

    /// Return the forum topic bound to `user_id`, creating one (and its
    /// pinned info card) if this is the user's first contact.
    ///
    /// Concurrent first-contact requests race to acquire the topic-create
    /// lock; the loser re-reads the user row after a short backoff instead
    /// of creating a duplicate topic.
    pub async fn ensure_topic(&self, user_id: &str, display_name: &str) -> Result<ThreadId> {
        let user = self.store.users.require(user_id)?;
        if let Some(topic_id) = user.topic_id {
            return Ok(ThreadId(MessageId(topic_id as i32)));
        }

        let lock_key = format!("topic_create:{user_id}");
        if !self.topic_locks.try_acquire(&lock_key) {
            return self.wait_for_topic(user_id).await;
        }

        // Re-read: another request may have finished binding while we were
        // acquiring the lock.
        let user = self.store.users.require(user_id)?;
        if let Some(topic_id) = user.topic_id {
            self.topic_locks.release(&lock_key);
            return Ok(ThreadId(MessageId(topic_id as i32)));
        }

        let result = self.create_topic_and_card(user_id, display_name).await;
        self.topic_locks.release(&lock_key);
        result
    }

    async fn wait_for_topic(&self, user_id: &str) -> Result<ThreadId> {
        for _ in 0..TOPIC_CREATE_RETRY_ATTEMPTS {
            tokio::time::sleep(Duration::from_millis(TOPIC_CREATE_RETRY_DELAY_MS)).await;
            if let Some(user) = self.store.users.get(user_id)? {
                if let Some(topic_id) = user.topic_id {
                    return Ok(ThreadId(MessageId(topic_id as i32)));
                }
            }
        }
        Err(RelayError::NotBound)
    }

    async fn create_topic_and_card(&self, user_id: &str, display_name: &str) -> Result<ThreadId> {
        let name: String = display_name.chars().take(TOPIC_NAME_MAX_LEN).collect();
        let thread_id = self.telegram.create_forum_topic(self.admin_group_id, &name).await?;
        self.store.users.set_topic(user_id, thread_id.0 .0 as i64)?;

        let card_text = format!("New contact\nuser_id: {user_id}\nname: {display_name}");
        let card_id = self
            .telegram
            .send_text_with_keyboard(self.admin_group_id, Some(thread_id), &card_text, card_keyboard(user_id))
            .await?;
        // Best-effort: a pin failure (e.g. missing admin rights) must not fail topic creation.
        self.telegram.pin_message(self.admin_group_id, card_id).await.ok();
        self.store.users.patch_info(
            user_id,
            relaybot_store::types::UserInfoPatch {
                card_msg_id: Some(Some(card_id.0)),
                ..Default::default()
            },
        )?;

        info!(user_id, topic_id = thread_id.0 .0, "created forum topic for new contact");
        Ok(thread_id)
    }

    /// Forward (preferred) or copy `message_id` from the user's DM into
    /// their bound topic, recreating the topic if Telegram reports it gone.
    pub async fn relay_to_topic(
        &self,
        user_id: &str,
        display_name: &str,
        from_chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<MessageId> {
        let thread_id = self.ensure_topic(user_id, display_name).await?;
        match self
            .forward_or_copy(thread_id, from_chat_id, message_id)
            .await
        {
            Ok(id) => Ok(id),
            Err(e) if e.is_topic_lost() => {
                warn!(user_id, "bound topic lost, recreating");
                self.store.users.clear_topic(user_id)?;
                let thread_id = self.ensure_topic(user_id, display_name).await?;
                self.forward_or_copy(thread_id, from_chat_id, message_id).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `forwardMessage` preserves the "Forwarded from" attribution, but some
    /// senders (e.g. with forwarding restricted) reject it outright; falling
    /// back to `copyMessage` still gets the text/caption across.
    async fn forward_or_copy(
        &self,
        thread_id: ThreadId,
        from_chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<MessageId> {
        match self
            .telegram
            .forward_message(self.admin_group_id, Some(thread_id), from_chat_id, message_id)
            .await
        {
            Ok(id) => Ok(id),
            Err(e) if e.is_topic_lost() => Err(e.into()),
            Err(e) => {
                warn!(error = %e, "forward failed, falling back to copy");
                Ok(self
                    .telegram
                    .copy_message(self.admin_group_id, Some(thread_id), from_chat_id, message_id)
                    .await?)
            }
        }
    }

    /// Relay an admin's reply from the bound topic back to the user's DM.
    pub async fn relay_to_user(
        &self,
        user_id: &str,
        from_chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<MessageId> {
        let user_chat_id: i64 = user_id
            .parse()
            .map_err(|_| RelayError::NotBound)?;
        Ok(self
            .telegram
            .copy_message(ChatId(user_chat_id), None, from_chat_id, message_id)
            .await?)
    }

    /// Delivery acknowledgement in the admin group: a silent "✅" reply
    /// threaded to the admin's message, so it doesn't page anyone.
    pub async fn acknowledge_delivery(&self, chat_id: ChatId, thread_id: Option<ThreadId>, message_id: MessageId) -> Result<()> {
        self.telegram
            .reply_silently(chat_id, thread_id, message_id, "\u{2705}")
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_keyboard_has_one_button_per_action() {
        let markup = card_keyboard("7");
        let count: usize = markup.inline_keyboard.iter().map(|row| row.len()).sum();
        assert_eq!(count, 4);
    }
}
