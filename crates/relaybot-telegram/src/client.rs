//! Thin wrapper over the teloxide `Bot` API client.
//!
//! The gateway runs in webhook mode (Telegram pushes updates to our HTTP
//! endpoint) rather than long polling, so there is no `Dispatcher` loop
//! here — just a typed façade over the handful of Bot API methods the
//! relay engine calls.

use teloxide::payloads::{
    AnswerCallbackQuerySetters, CopyMessageSetters, EditForumTopicSetters,
    EditMessageReplyMarkupSetters, ForwardMessageSetters, SendMessageSetters,
};
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardMarkup, MessageId, ReactionType, ThreadId,
};
use tracing::warn;

use crate::error::{Result, TelegramError};

#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> Self {
        Self {
            bot: Bot::new(bot_token),
        }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub async fn send_text(&self, chat_id: ChatId, thread_id: Option<ThreadId>, text: &str) -> Result<MessageId> {
        let mut req = self.bot.send_message(chat_id, text);
        if let Some(tid) = thread_id {
            req = req.message_thread_id(tid);
        }
        let msg = req.await?;
        Ok(msg.id)
    }

    pub async fn send_text_with_keyboard(
        &self,
        chat_id: ChatId,
        thread_id: Option<ThreadId>,
        text: &str,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<MessageId> {
        let mut req = self.bot.send_message(chat_id, text).reply_markup(keyboard);
        if let Some(tid) = thread_id {
            req = req.message_thread_id(tid);
        }
        let msg = req.await?;
        Ok(msg.id)
    }

    pub async fn edit_text(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()> {
        self.bot.edit_message_text(chat_id, message_id, text).await?;
        Ok(())
    }

    pub async fn edit_reply_markup(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<()> {
        self.bot
            .edit_message_reply_markup(chat_id, message_id)
            .reply_markup(keyboard)
            .await?;
        Ok(())
    }

    pub async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.bot.delete_message(chat_id, message_id).await?;
        Ok(())
    }

    pub async fn forward_message(
        &self,
        to_chat_id: ChatId,
        thread_id: Option<ThreadId>,
        from_chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<MessageId> {
        let mut req = self.bot.forward_message(to_chat_id, from_chat_id, message_id);
        if let Some(tid) = thread_id {
            req = req.message_thread_id(tid);
        }
        let msg = req.await?;
        Ok(msg.id)
    }

    pub async fn copy_message(
        &self,
        to_chat_id: ChatId,
        thread_id: Option<ThreadId>,
        from_chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<MessageId> {
        let mut req = self.bot.copy_message(to_chat_id, from_chat_id, message_id);
        if let Some(tid) = thread_id {
            req = req.message_thread_id(tid);
        }
        let result = req.await?;
        Ok(MessageId(result.0))
    }

    pub async fn create_forum_topic(&self, chat_id: ChatId, name: &str) -> Result<ThreadId> {
        let topic = self.bot.create_forum_topic(chat_id, name).await?;
        Ok(topic.thread_id)
    }

    pub async fn rename_forum_topic(&self, chat_id: ChatId, thread_id: ThreadId, name: &str) -> Result<()> {
        self.bot
            .edit_forum_topic(chat_id, thread_id)
            .name(name)
            .await?;
        Ok(())
    }

    pub async fn pin_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.bot.pin_chat_message(chat_id, message_id).await?;
        Ok(())
    }

    /// Best-effort delivery ack: react with an emoji, falling back to a
    /// short text reply if the platform rejects the reaction (e.g. custom
    /// emoji not available on this chat's tier).
    pub async fn react_or_reply(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        emoji: &str,
        fallback_text: &str,
    ) -> Result<()> {
        let reaction = vec![ReactionType::Emoji {
            emoji: emoji.to_string(),
        }];
        let outcome = self
            .bot
            .set_message_reaction(chat_id, message_id)
            .reaction(reaction)
            .await;
        if let Err(e) = outcome {
            warn!(error = %e, "reaction delivery failed, falling back to text ack");
            self.bot
                .send_message(chat_id, fallback_text)
                .reply_parameters(teloxide::types::ReplyParameters::new(message_id))
                .disable_notification(true)
                .await?;
        }
        Ok(())
    }

    /// A silent text reply threaded to `reply_to`, used for the admin-group
    /// delivery receipt: references the admin's message without paging them.
    pub async fn reply_silently(
        &self,
        chat_id: ChatId,
        thread_id: Option<ThreadId>,
        reply_to: MessageId,
        text: &str,
    ) -> Result<MessageId> {
        let mut req = self
            .bot
            .send_message(chat_id, text)
            .reply_parameters(teloxide::types::ReplyParameters::new(reply_to))
            .disable_notification(true);
        if let Some(tid) = thread_id {
            req = req.message_thread_id(tid);
        }
        let msg = req.await?;
        Ok(msg.id)
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str, text: Option<&str>) -> Result<()> {
        let mut req = self.bot.answer_callback_query(callback_query_id);
        if let Some(t) = text {
            req = req.text(t);
        }
        req.await?;
        Ok(())
    }
}

pub fn is_topic_lost(err: &TelegramError) -> bool {
    err.is_topic_lost()
}
