//! POST / — Telegram webhook ingress.
//!
//! Telegram requires a 200 response for every delivered update regardless of
//! how processing turned out, or it will keep retrying the same update.
//! Deserialization failures are the one exception — a genuinely malformed
//! body gets a 400 so the platform can flag the webhook as misconfigured.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use teloxide::types::{CallbackQuery, Message, MessageOrigin, Update, UpdateKind};
use tracing::{error, warn};

use relaybot_core::types::{CaptchaMode, ContentKind, UserState};
use relaybot_relay::{AdmissionStep, Board, BoardKind, PolicyEngine, PolicyOutcome};

use crate::app::AppState;

pub async fn webhook_handler(State(state): State<Arc<AppState>>, Json(update): Json<Update>) -> StatusCode {
    if let Err(e) = dispatch(&state, update).await {
        error!(error = %e, "webhook update processing failed");
    }
    StatusCode::OK
}

async fn dispatch(state: &AppState, update: Update) -> anyhow::Result<()> {
    match update.kind {
        UpdateKind::Message(msg) => handle_message(state, msg).await,
        UpdateKind::CallbackQuery(cb) => handle_callback_query(state, cb).await,
        _ => Ok(()),
    }
}

async fn handle_message(state: &AppState, msg: Message) -> anyhow::Result<()> {
    let chat_id = msg.chat.id;

    if chat_id.0 == state.config.admin_group_id {
        return handle_admin_group_message(state, msg).await;
    }

    let Some(sender) = msg.from() else {
        return Ok(());
    };
    let sender_id = sender.id.0.to_string();

    let store = state.engine.store();
    if state.config.is_primary_admin(&sender_id) || relaybot_admin::list_rules::is_authorized_admin(&store.config, &sender_id) {
        return handle_admin_dm(state, &sender_id, &msg).await;
    }

    handle_user_message(state, &sender_id, sender.full_name(), &msg).await
}

/// An admin's reply, sent inside the user's bound topic in the admin group.
async fn handle_admin_group_message(state: &AppState, msg: Message) -> anyhow::Result<()> {
    let Some(thread_id) = msg.thread_id else {
        return Ok(());
    };
    let store = state.engine.store();
    let Some(user) = store.users.find_by_topic(thread_id.0 .0 as i64)? else {
        warn!(topic_id = thread_id.0 .0, "admin reply in an unbound topic");
        return Ok(());
    };

    // A pending note-edit (started from the card's "Note" button) intercepts
    // this admin's next message in the topic instead of it being relayed.
    if let Some(admin) = msg.from() {
        let admin_id = admin.id.0.to_string();
        if let Some(state_row) = relaybot_admin::input_flow::pending(&store.config, &admin_id) {
            if state_row.action == relaybot_store::types::AdminAction::InputNote {
                if let Some(text) = msg.text() {
                    let note = if text == "/clear" || text == "清除" { None } else { Some(text.to_string()) };
                    store.users.patch_info(
                        &state_row.target,
                        relaybot_store::types::UserInfoPatch {
                            note: Some(note),
                            ..Default::default()
                        },
                    )?;
                    relaybot_admin::input_flow::cancel(&store.config, &admin_id)?;
                }
                return Ok(());
            }
        }
    }

    state.engine.relay_to_user(&user.id, msg.chat.id, msg.id).await?;
    if store.config.get_bool("enable_admin_receipt") {
        state
            .engine
            .acknowledge_delivery(msg.chat.id, Some(thread_id), msg.id)
            .await?;
    }
    Ok(())
}

/// Admin console traffic: the admin's private DM with the bot.
async fn handle_admin_dm(state: &AppState, admin_id: &str, msg: &Message) -> anyhow::Result<()> {
    let store = state.engine.store();
    let Some(text) = msg.text() else {
        return Ok(());
    };

    if text == "/cancel" {
        relaybot_admin::input_flow::cancel(&store.config, admin_id)?;
        state.engine.telegram().send_text(msg.chat.id, None, "Cancelled.").await?;
        return Ok(());
    }

    if text == "/whoami" {
        state
            .engine
            .telegram()
            .send_text(msg.chat.id, None, &format!("Your Telegram user id: {admin_id}"))
            .await?;
        return Ok(());
    }

    if let Some(result) = relaybot_admin::console::complete_pending_input(&store.config, &store.users, admin_id, text)? {
        return send_console_result(state, msg.chat.id, result).await;
    }

    if text == "/start" || text == "/admin" {
        let rendered = relaybot_admin::menu::render(relaybot_admin::MenuId::Base, &store.config);
        state
            .engine
            .telegram()
            .send_text_with_keyboard(msg.chat.id, None, &rendered.text, rendered.keyboard)
            .await?;
    }
    Ok(())
}

async fn send_console_result(
    state: &AppState,
    chat_id: teloxide::types::ChatId,
    result: relaybot_admin::ConsoleResult,
) -> anyhow::Result<()> {
    match result {
        relaybot_admin::ConsoleResult::Render(rendered) => {
            state
                .engine
                .telegram()
                .send_text_with_keyboard(chat_id, None, &rendered.text, rendered.keyboard)
                .await?;
        }
        relaybot_admin::ConsoleResult::PromptForInput { prompt, .. } => {
            state.engine.telegram().send_text(chat_id, None, &prompt).await?;
        }
        relaybot_admin::ConsoleResult::Toast(text) => {
            state.engine.telegram().send_text(chat_id, None, &text).await?;
        }
    }
    Ok(())
}

/// A regular contact's DM: admission gate, then the content policy pipeline.
async fn handle_user_message(state: &AppState, user_id: &str, display_name: &str, msg: &Message) -> anyhow::Result<()> {
    let store = state.engine.store();
    let user = store.users.get_or_create(user_id)?;

    if user.is_blocked {
        if msg.text() == Some("/start") {
            store.users.set_blocked(user_id, false)?;
            store.users.reset_violations(user_id)?;
            let blacklist = Board::new(BoardKind::Blacklist, store, state.engine.telegram(), state.engine.admin_group_id());
            blacklist.remove_card(&user).await?;
            store.users.set_state(user_id, UserState::New)?;
        } else {
            return Ok(());
        }
    }

    let enable_verify = store.config.get_bool("enable_verify");
    let enable_qa_verify = store.config.get_bool("enable_qa_verify");
    let captcha_mode: CaptchaMode = store.config.get("captcha_mode").parse().unwrap_or(CaptchaMode::Off);

    if user.state == UserState::New {
        let initial = relaybot_relay::admission::initial_pending_state(enable_verify, enable_qa_verify, captcha_mode);
        store.users.set_state(user_id, initial)?;
    }
    let user = store.users.require(user_id)?;

    match relaybot_relay::next_step(user.state, enable_verify, enable_qa_verify, captcha_mode) {
        AdmissionStep::NeedsCaptcha => {
            let url = format!("{}/verify?user_id={}", state.config.worker_url, user_id);
            state
                .engine
                .telegram()
                .send_text(msg.chat.id, None, &format!("Please verify to continue: {url}"))
                .await?;
        }
        AdmissionStep::NeedsQuestion => {
            if user.state == UserState::PendingVerification {
                if let Some(text) = msg.text() {
                    let answer = store.config.get("qa_answer");
                    if text.trim().eq_ignore_ascii_case(answer.trim()) {
                        store.users.set_state(user_id, UserState::Verified)?;
                        state.engine.ensure_topic(user_id, display_name).await?;
                        state.engine.telegram().send_text(msg.chat.id, None, "Verified, welcome!").await?;
                        return Ok(());
                    }
                }
            }
            let question = store.config.get("qa_question");
            state.engine.telegram().send_text(msg.chat.id, None, &question).await?;
        }
        AdmissionStep::SkipVerification => {
            store.users.set_state(user_id, UserState::Verified)?;
            relay_through_policy(state, user_id, display_name, msg).await?;
        }
        AdmissionStep::Verified => {
            relay_through_policy(state, user_id, display_name, msg).await?;
        }
    }
    Ok(())
}

async fn relay_through_policy(state: &AppState, user_id: &str, display_name: &str, msg: &Message) -> anyhow::Result<()> {
    let store = state.engine.store();
    if store.users.require(user_id)?.is_blocked {
        return Ok(());
    }

    let kind = content_kind_of(msg);
    let policy = PolicyEngine::new(&store.config, &store.users);
    match policy.evaluate(user_id, kind, msg.text(), false)? {
        PolicyOutcome::Suppressed { .. } => Ok(()),
        PolicyOutcome::Blocked => {
            let user = store.users.require(user_id)?;
            let blacklist = Board::new(BoardKind::Blacklist, store, state.engine.telegram(), state.engine.admin_group_id());
            blacklist.upsert_card(&user, None).await?;
            Ok(())
        }
        PolicyOutcome::Allow { auto_reply } => {
            state
                .engine
                .relay_to_topic(user_id, display_name, msg.chat.id, msg.id)
                .await?;
            store.messages.insert(&relaybot_store::types::MessageRecord {
                user_id: user_id.to_string(),
                message_id: msg.id.0 as i64,
                text: msg.text().map(str::to_string),
                date: msg.date.timestamp(),
            })?;
            let user = store.users.require(user_id)?;
            let inbox = Board::new(BoardKind::Inbox, store, state.engine.telegram(), state.engine.admin_group_id());
            inbox.upsert_card(&user, msg.text()).await?;
            state
                .engine
                .telegram()
                .react_or_reply(msg.chat.id, msg.id, "\u{1F44D}", "Received.")
                .await
                .ok();
            if let Some(reply) = auto_reply {
                state.engine.telegram().send_text(msg.chat.id, None, &reply).await?;
            }
            maybe_send_quiet_hours_notice(state, user_id, msg).await?;
            Ok(())
        }
    }
}

/// If `busy_mode` is on and enough time has passed since the last notice to
/// this user, send `busy_msg` and stamp `last_busy_reply`. Never blocks relaying.
async fn maybe_send_quiet_hours_notice(state: &AppState, user_id: &str, msg: &Message) -> anyhow::Result<()> {
    let store = state.engine.store();
    let busy_mode = store.config.get_bool("busy_mode");
    let user = store.users.require(user_id)?;
    let now = msg.date.timestamp();
    if !relaybot_relay::should_send_quiet_hours_notice(busy_mode, user.info.last_busy_reply, now) {
        return Ok(());
    }
    let busy_msg = store.config.get("busy_msg");
    state.engine.telegram().send_text(msg.chat.id, None, &busy_msg).await?;
    store.users.patch_info(
        user_id,
        relaybot_store::types::UserInfoPatch {
            last_busy_reply: Some(Some(now)),
            ..Default::default()
        },
    )?;
    Ok(())
}

fn content_kind_of(msg: &Message) -> ContentKind {
    if let Some(origin) = msg.forward_origin() {
        return match origin {
            MessageOrigin::Channel { .. } => ContentKind::ForwardedChannel,
            MessageOrigin::Chat { .. } => ContentKind::ForwardedGroup,
            _ => ContentKind::ForwardedUser,
        };
    }
    if msg.voice().is_some() || msg.audio().is_some() {
        ContentKind::AudioVoice
    } else if msg.sticker().is_some() || msg.animation().is_some() {
        ContentKind::StickerAnimation
    } else if msg.photo().is_some() || msg.video().is_some() || msg.document().is_some() {
        ContentKind::Media
    } else if msg.text().map(|t| t.contains("http://") || t.contains("https://")).unwrap_or(false) {
        ContentKind::Link
    } else {
        ContentKind::Text
    }
}

/// Admin console inline-keyboard taps.
async fn handle_callback_query(state: &AppState, cb: CallbackQuery) -> anyhow::Result<()> {
    let admin_id = cb.from.id.0.to_string();
    let store = state.engine.store();
    let is_admin = state.config.is_primary_admin(&admin_id) || relaybot_admin::list_rules::is_authorized_admin(&store.config, &admin_id);
    if !is_admin {
        state.engine.telegram().answer_callback_query(&cb.id, Some("Not authorized.")).await?;
        return Ok(());
    }

    let Some(data) = cb.data.as_deref() else {
        return Ok(());
    };

    if data.starts_with("card:") {
        return handle_card_callback_query(state, &cb, &admin_id, data).await;
    }

    if let Some(user_id) = data.strip_prefix("board:ack:") {
        if let Some(user) = store.users.get(user_id)? {
            let inbox = Board::new(BoardKind::Inbox, store, state.engine.telegram(), state.engine.admin_group_id());
            inbox.remove_card(&user).await?;
        }
        state.engine.telegram().answer_callback_query(&cb.id, None).await?;
        return Ok(());
    }

    let result = relaybot_admin::console::handle_callback(&store.config, &admin_id, data)?;

    let Some(message) = cb.message.as_ref() else {
        state.engine.telegram().answer_callback_query(&cb.id, None).await?;
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    match result {
        relaybot_admin::ConsoleResult::Render(rendered) => {
            state.engine.telegram().edit_text(chat_id, message_id, &rendered.text).await.ok();
            state
                .engine
                .telegram()
                .edit_reply_markup(chat_id, message_id, rendered.keyboard)
                .await
                .ok();
            state.engine.telegram().answer_callback_query(&cb.id, None).await?;
        }
        relaybot_admin::ConsoleResult::PromptForInput { prompt, .. } => {
            state.engine.telegram().send_text(chat_id, None, &prompt).await?;
            state.engine.telegram().answer_callback_query(&cb.id, None).await?;
        }
        relaybot_admin::ConsoleResult::Toast(text) => {
            state.engine.telegram().answer_callback_query(&cb.id, Some(&text)).await?;
        }
    }
    Ok(())
}

/// Block/unblock/note/pin taps on a user's info card.
async fn handle_card_callback_query(state: &AppState, cb: &CallbackQuery, admin_id: &str, data: &str) -> anyhow::Result<()> {
    let store = state.engine.store();
    let result = relaybot_admin::handle_card_callback(store, state.engine.telegram(), state.engine.admin_group_id(), admin_id, data).await?;
    match result {
        relaybot_admin::CardResult::Toast(text) => {
            state.engine.telegram().answer_callback_query(&cb.id, Some(&text)).await?;
        }
        relaybot_admin::CardResult::PromptForNote { user_id } => {
            // Answered in place: the admin's next message in the user's own
            // topic is intercepted by handle_admin_group_message as the note
            // text ("/clear" or "清除" empties it) rather than relayed.
            if let Some(message) = cb.message.as_ref() {
                let thread = store
                    .users
                    .get(&user_id)?
                    .and_then(|u| u.topic_id)
                    .map(|id| teloxide::types::ThreadId(teloxide::types::MessageId(id as i32)));
                state
                    .engine
                    .telegram()
                    .send_text(message.chat().id, thread, "Send the note text, or /clear to empty it.")
                    .await?;
            }
            state.engine.telegram().answer_callback_query(&cb.id, None).await?;
        }
    }
    Ok(())
}
