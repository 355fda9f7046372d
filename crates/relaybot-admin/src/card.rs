//! Inline-keyboard actions on a user's info card: block/unblock, attach a
//! note, pin the card. Unlike the `config:` console these act on a single
//! user row and may also touch Telegram state directly (the blacklist
//! board, the pinned flag), so this handler owns those calls instead of
//! just describing what the gateway should render.

use teloxide::types::{ChatId, MessageId};

use relaybot_relay::{Board, BoardKind};
use relaybot_store::Store;
use relaybot_telegram::TelegramClient;

use crate::error::{AdminError, Result};
use crate::input_flow;

pub enum CardResult {
    /// A small transient acknowledgement (answered as a callback-query toast).
    Toast(String),
    /// The admin's next text message is consumed as the note for this user.
    PromptForNote { user_id: String },
}

/// Grammar: `card:<verb>:<user_id>`.
pub async fn handle_card_callback(
    store: &Store,
    telegram: &TelegramClient,
    admin_group_id: ChatId,
    admin_id: &str,
    data: &str,
) -> Result<CardResult> {
    let mut parts = data.split(':');
    let ns = parts.next().ok_or_else(|| AdminError::BadCallback(data.to_string()))?;
    if ns != "card" {
        return Err(AdminError::BadCallback(data.to_string()));
    }
    let verb = parts.next().ok_or_else(|| AdminError::BadCallback(data.to_string()))?;
    let user_id = parts
        .next()
        .ok_or_else(|| AdminError::BadCallback(data.to_string()))?
        .to_string();

    match verb {
        "block" => {
            store.users.set_blocked(&user_id, true)?;
            let user = store.users.require(&user_id)?;
            Board::new(BoardKind::Blacklist, store, telegram, admin_group_id)
                .upsert_card(&user, None)
                .await?;
            Ok(CardResult::Toast("User blocked.".to_string()))
        }
        "unblock" => {
            store.users.set_blocked(&user_id, false)?;
            store.users.reset_violations(&user_id)?;
            let user = store.users.require(&user_id)?;
            Board::new(BoardKind::Blacklist, store, telegram, admin_group_id)
                .remove_card(&user)
                .await?;
            Ok(CardResult::Toast("User unblocked.".to_string()))
        }
        "note" => {
            input_flow::begin_edit_note(&store.config, admin_id, &user_id)?;
            Ok(CardResult::PromptForNote { user_id })
        }
        "pin" => {
            let user = store.users.require(&user_id)?;
            if let Some(msg_id) = user.info.card_msg_id {
                telegram.pin_message(admin_group_id, MessageId(msg_id)).await?;
            }
            Ok(CardResult::Toast("Pinned.".to_string()))
        }
        other => Err(AdminError::BadCallback(format!("unknown verb: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn note_verb_begins_pending_input() {
        let store = store();
        store.users.get_or_create("7").unwrap();
        input_flow::begin_edit_note(&store.config, "1", "7").unwrap();
        assert!(input_flow::pending(&store.config, "1").is_some());
    }
}
