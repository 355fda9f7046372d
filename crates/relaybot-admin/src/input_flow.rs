//! Two-step scalar-edit and note-edit flow: an admin taps "Edit", the bot
//! asks for the new value in a plain message, and the next text message
//! from that admin is consumed as the answer instead of being treated as a
//! new command. `/cancel` abandons the flow without applying anything.

use relaybot_store::types::{AdminAction, AdminInputState};
use relaybot_store::types::UserInfoPatch;
use relaybot_store::ConfigStore;
use relaybot_store::UserStore;

use crate::error::Result;

pub fn begin_edit_config(config: &ConfigStore, admin_id: &str, key: &str) -> Result<()> {
    config.set_admin_state(&AdminInputState {
        admin_user_id: admin_id.to_string(),
        action: AdminAction::Input,
        target: key.to_string(),
    })?;
    Ok(())
}

pub fn begin_edit_note(config: &ConfigStore, admin_id: &str, target_user_id: &str) -> Result<()> {
    config.set_admin_state(&AdminInputState {
        admin_user_id: admin_id.to_string(),
        action: AdminAction::InputNote,
        target: target_user_id.to_string(),
    })?;
    Ok(())
}

pub fn cancel(config: &ConfigStore, admin_id: &str) -> Result<()> {
    config.clear_admin_state(admin_id)?;
    Ok(())
}

pub fn pending(config: &ConfigStore, admin_id: &str) -> Option<AdminInputState> {
    config.get_admin_state(admin_id)
}

/// Apply `text` as the answer to the admin's pending input, then clear it.
/// No-op (returns `Ok(false)`) if the admin has nothing pending.
pub fn apply_input(config: &ConfigStore, users: &UserStore, admin_id: &str, text: &str) -> Result<bool> {
    let Some(state) = pending(config, admin_id) else {
        return Ok(false);
    };

    match state.action {
        AdminAction::Input => {
            config.set(&state.target, text)?;
        }
        AdminAction::InputNote => {
            users.patch_info(
                &state.target,
                UserInfoPatch {
                    note: Some(Some(text.to_string())),
                    ..Default::default()
                },
            )?;
        }
    }

    config.clear_admin_state(admin_id)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> relaybot_store::Store {
        relaybot_store::Store::open_in_memory().unwrap()
    }

    #[test]
    fn edit_config_flow_applies_and_clears() {
        let store = store();
        begin_edit_config(&store.config, "1", "welcome_msg").unwrap();
        assert!(pending(&store.config, "1").is_some());

        let applied = apply_input(&store.config, &store.users, "1", "new welcome text").unwrap();
        assert!(applied);
        assert_eq!(store.config.get("welcome_msg"), "new welcome text");
        assert!(pending(&store.config, "1").is_none());
    }

    #[test]
    fn edit_note_flow_patches_user_info() {
        let store = store();
        store.users.get_or_create("42").unwrap();
        begin_edit_note(&store.config, "1", "42").unwrap();

        apply_input(&store.config, &store.users, "1", "flagged for follow-up").unwrap();
        let user = store.users.require("42").unwrap();
        assert_eq!(user.info.note.as_deref(), Some("flagged for follow-up"));
    }

    #[test]
    fn apply_input_without_pending_state_is_noop() {
        let store = store();
        let applied = apply_input(&store.config, &store.users, "1", "text").unwrap();
        assert!(!applied);
    }

    #[test]
    fn cancel_clears_pending_state() {
        let store = store();
        begin_edit_config(&store.config, "1", "welcome_msg").unwrap();
        cancel(&store.config, "1").unwrap();
        assert!(pending(&store.config, "1").is_none());
    }
}
