//! Admin console dispatch: turns a parsed [`Callback`] into a state change
//! plus whatever should be shown next. Callers (the gateway's webhook
//! handler) own the actual Telegram API calls — this module only touches
//! the store and decides what to render.

use relaybot_core::types::CaptchaMode;
use relaybot_store::types::AdminAction;
use relaybot_store::{ConfigStore, UserStore};

use crate::callback::{Callback, MenuId};
use crate::error::Result;
use crate::input_flow;
use crate::list_rules;
use crate::menu::{self, Rendered};

/// What the gateway should do in response to a console interaction.
pub enum ConsoleResult {
    /// Replace the console message with this rendered menu.
    Render(Rendered),
    /// Render `menu`, and additionally prompt the admin for free-text input
    /// (the next text message from them completes the edit).
    PromptForInput { menu: MenuId, prompt: String },
    /// A small transient acknowledgement (answered as a callback-query toast).
    Toast(String),
}

pub fn handle_callback(config: &ConfigStore, admin_id: &str, data: &str) -> Result<ConsoleResult> {
    let callback = Callback::parse(data)?;
    match callback {
        Callback::Menu(menu_id) => Ok(ConsoleResult::Render(menu::render(menu_id, config))),

        Callback::Toggle(key) => {
            let now_on = !config.get_bool(&key);
            config.set(&key, if now_on { "true" } else { "false" })?;
            Ok(ConsoleResult::Render(menu::render(menu_for_key(&key), config)))
        }

        Callback::Edit(key) => {
            input_flow::begin_edit_config(config, admin_id, &key)?;
            Ok(ConsoleResult::PromptForInput {
                menu: menu_for_key(&key),
                prompt: format!("Send the new value for {key}, or /cancel."),
            })
        }

        Callback::Add(key) => {
            let (menu_id, prompt) = match key.as_str() {
                "block_keywords" => (MenuId::BlockKeyword, "Send the keyword to block, or /cancel."),
                "keyword_responses" => (
                    MenuId::AutoReply,
                    "Send the rule as trigger===reply, or /cancel.",
                ),
                "authorized_admins" => (
                    MenuId::AuthorizedAdmins,
                    "Send the Telegram user id to authorize, or /cancel.",
                ),
                _ => (MenuId::Base, "Send the value to add, or /cancel."),
            };
            input_flow::begin_edit_config(config, admin_id, &key)?;
            Ok(ConsoleResult::PromptForInput {
                menu: menu_id,
                prompt: prompt.to_string(),
            })
        }

        Callback::Del { key, value } => {
            match key.as_str() {
                "block_keywords" => list_rules::del_block_keyword(config, &value)?,
                "keyword_responses" => list_rules::del_auto_reply(config, &value)?,
                "authorized_admins" => list_rules::del_authorized_admin(config, &value)?,
                _ => {}
            }
            Ok(ConsoleResult::Render(menu::render(menu_for_key(&key), config)))
        }

        Callback::Clear(key) => {
            match key.as_str() {
                "block_keywords" => list_rules::clear_block_keywords(config)?,
                "keyword_responses" => list_rules::clear_auto_replies(config)?,
                _ => {}
            }
            Ok(ConsoleResult::Render(menu::render(menu_for_key(&key), config)))
        }

        Callback::RotateMode => {
            let current: CaptchaMode = config.get("captcha_mode").parse().unwrap_or(CaptchaMode::Off);
            let enable_verify = config.get_bool("enable_verify");
            let (next_enable, next_mode) = CaptchaMode::rotate_verification(enable_verify, current);
            config.set("enable_verify", if next_enable { "true" } else { "false" })?;
            config.set("captcha_mode", &next_mode.to_string())?;
            Ok(ConsoleResult::Render(menu::render(MenuId::QuietHours, config)))
        }
    }
}

/// Complete a pending two-step input started by `Edit`/`Add`. Routes
/// list-shaped keys through [`list_rules`] instead of a plain overwrite.
pub fn complete_pending_input(
    config: &ConfigStore,
    users: &UserStore,
    admin_id: &str,
    text: &str,
) -> Result<Option<ConsoleResult>> {
    let Some(state) = input_flow::pending(config, admin_id) else {
        return Ok(None);
    };

    if state.action == AdminAction::InputNote {
        input_flow::apply_input(config, users, admin_id, text)?;
        return Ok(Some(ConsoleResult::Toast("Note saved.".to_string())));
    }

    match state.target.as_str() {
        "block_keywords" => {
            list_rules::add_block_keyword(config, text)?;
            input_flow::cancel(config, admin_id)?;
        }
        "keyword_responses" => {
            list_rules::add_auto_reply(config, text)?;
            input_flow::cancel(config, admin_id)?;
        }
        "authorized_admins" => {
            list_rules::add_authorized_admin(config, text)?;
            input_flow::cancel(config, admin_id)?;
        }
        _ => {
            input_flow::apply_input(config, users, admin_id, text)?;
        }
    }

    let menu_id = menu_for_key(&state.target);
    Ok(Some(ConsoleResult::Render(menu::render(menu_id, config))))
}

fn menu_for_key(key: &str) -> MenuId {
    match key {
        "block_keywords" | "block_keyword_threshold" => MenuId::BlockKeyword,
        "keyword_responses" => MenuId::AutoReply,
        "authorized_admins" => MenuId::AuthorizedAdmins,
        "busy_mode" | "busy_msg" | "captcha_mode" | "enable_verify" | "enable_qa_verify" => MenuId::QuietHours,
        "enable_admin_receipt" => MenuId::BackupBoards,
        k if k.starts_with("enable_") => MenuId::FilterToggles,
        _ => MenuId::Base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> relaybot_store::Store {
        relaybot_store::Store::open_in_memory().unwrap()
    }

    #[test]
    fn toggle_flips_the_value() {
        let store = store();
        assert!(!store.config.get_bool("enable_text_forwarding"));
        handle_callback(&store.config, "1", "config:toggle:enable_text_forwarding").unwrap();
        assert!(store.config.get_bool("enable_text_forwarding"));
    }

    #[test]
    fn rotate_mode_cycles_the_enable_verify_and_captcha_mode_pair() {
        let store = store();

        handle_callback(&store.config, "1", "config:rotate_mode").unwrap();
        assert!(store.config.get_bool("enable_verify"));
        assert_eq!(store.config.get("captcha_mode"), "turnstile");

        handle_callback(&store.config, "1", "config:rotate_mode").unwrap();
        assert!(store.config.get_bool("enable_verify"));
        assert_eq!(store.config.get("captcha_mode"), "recaptcha");

        handle_callback(&store.config, "1", "config:rotate_mode").unwrap();
        assert!(!store.config.get_bool("enable_verify"));
        assert_eq!(store.config.get("captcha_mode"), "recaptcha");

        handle_callback(&store.config, "1", "config:rotate_mode").unwrap();
        assert!(store.config.get_bool("enable_verify"));
        assert_eq!(store.config.get("captcha_mode"), "turnstile");
    }

    #[test]
    fn add_block_keyword_flow_completes_on_next_message() {
        let store = store();
        handle_callback(&store.config, "1", "config:add:block_keywords").unwrap();
        let result = complete_pending_input(&store.config, &store.users, "1", "spam").unwrap();
        assert!(result.is_some());
        assert!(input_flow::pending(&store.config, "1").is_none());
    }

    #[test]
    fn edit_scalar_flow_completes_on_next_message() {
        let store = store();
        handle_callback(&store.config, "1", "config:edit:welcome_msg").unwrap();
        complete_pending_input(&store.config, &store.users, "1", "hi there").unwrap();
        assert_eq!(store.config.get("welcome_msg"), "hi there");
    }

    #[test]
    fn complete_pending_input_without_pending_state_returns_none() {
        let store = store();
        let result = complete_pending_input(&store.config, &store.users, "1", "text").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn note_input_flow_saves_note_and_toasts() {
        let store = store();
        store.users.get_or_create("42").unwrap();
        crate::input_flow::begin_edit_note(&store.config, "1", "42").unwrap();
        let result = complete_pending_input(&store.config, &store.users, "1", "flagged").unwrap();
        assert!(matches!(result, Some(ConsoleResult::Toast(_))));
        assert_eq!(store.users.require("42").unwrap().info.note.as_deref(), Some("flagged"));
    }
}
