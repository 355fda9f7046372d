//! Admin console menu rendering: each [`crate::callback::MenuId`] maps to a
//! block of text plus an inline keyboard built from the current config.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use relaybot_core::types::CaptchaMode;
use relaybot_store::ConfigStore;

use crate::callback::{Callback, MenuId};

pub struct Rendered {
    pub text: String,
    pub keyboard: InlineKeyboardMarkup,
}

pub fn render(menu: MenuId, config: &ConfigStore) -> Rendered {
    match menu {
        MenuId::Base => render_base(),
        MenuId::AutoReply => render_auto_reply(config),
        MenuId::BlockKeyword => render_block_keyword(config),
        MenuId::FilterToggles => render_filters(config),
        MenuId::AuthorizedAdmins => render_admins(config),
        MenuId::BackupBoards => render_boards(),
        MenuId::QuietHours => render_quiet_hours(config),
    }
}

fn nav_row(label: &str, menu: MenuId) -> Vec<InlineKeyboardButton> {
    vec![InlineKeyboardButton::callback(label, Callback::Menu(menu).to_data())]
}

fn back_row() -> Vec<InlineKeyboardButton> {
    nav_row("<< Back", MenuId::Base)
}

fn toggle_row(label: &str, key: &str, enabled: bool) -> Vec<InlineKeyboardButton> {
    let mark = if enabled { "[on]" } else { "[off]" };
    vec![InlineKeyboardButton::callback(
        format!("{label} {mark}"),
        Callback::Toggle(key.to_string()).to_data(),
    )]
}

fn render_base() -> Rendered {
    let keyboard = InlineKeyboardMarkup::new(vec![
        nav_row("Auto-reply rules", MenuId::AutoReply),
        nav_row("Block keywords", MenuId::BlockKeyword),
        nav_row("Forwarding filters", MenuId::FilterToggles),
        nav_row("Authorized admins", MenuId::AuthorizedAdmins),
        nav_row("Backup & notification boards", MenuId::BackupBoards),
        nav_row("Quiet hours", MenuId::QuietHours),
    ]);
    Rendered {
        text: "Admin console".to_string(),
        keyboard,
    }
}

fn render_auto_reply(config: &ConfigStore) -> Rendered {
    let rules = config.get_json("keyword_responses");
    let count = rules.as_array().map(|a| a.len()).unwrap_or(0);
    let mut rows = vec![vec![InlineKeyboardButton::callback(
        "Add rule (trigger===reply)",
        Callback::Add("keyword_responses".to_string()).to_data(),
    )]];
    rows.push(vec![InlineKeyboardButton::callback(
        "Clear all",
        Callback::Clear("keyword_responses".to_string()).to_data(),
    )]);
    rows.push(back_row());
    Rendered {
        text: format!("Auto-reply rules ({count} configured)"),
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

fn render_block_keyword(config: &ConfigStore) -> Rendered {
    let threshold = config.get("block_keyword_threshold");
    let count = config.get_json("block_keywords").as_array().map(|a| a.len()).unwrap_or(0);
    let rows = vec![
        vec![InlineKeyboardButton::callback(
            "Add keyword",
            Callback::Add("block_keywords".to_string()).to_data(),
        )],
        vec![InlineKeyboardButton::callback(
            "Edit violation threshold",
            Callback::Edit("block_keyword_threshold".to_string()).to_data(),
        )],
        vec![InlineKeyboardButton::callback(
            "Clear all",
            Callback::Clear("block_keywords".to_string()).to_data(),
        )],
        back_row(),
    ];
    Rendered {
        text: format!("Block keywords ({count} configured, threshold {threshold})"),
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

fn render_filters(config: &ConfigStore) -> Rendered {
    let rows = vec![
        toggle_row("Forwarded messages", "enable_forward_forwarding", config.get_bool("enable_forward_forwarding")),
        toggle_row("Forwarded channels", "enable_channel_forwarding", config.get_bool("enable_channel_forwarding")),
        toggle_row("Audio/voice", "enable_audio_forwarding", config.get_bool("enable_audio_forwarding")),
        toggle_row("Stickers/animations", "enable_sticker_forwarding", config.get_bool("enable_sticker_forwarding")),
        toggle_row("Media", "enable_media_forwarding", config.get_bool("enable_media_forwarding")),
        toggle_row("Links", "enable_link_forwarding", config.get_bool("enable_link_forwarding")),
        toggle_row("Text", "enable_text_forwarding", config.get_bool("enable_text_forwarding")),
        back_row(),
    ];
    Rendered {
        text: "Forwarding filters".to_string(),
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

fn render_admins(config: &ConfigStore) -> Rendered {
    let list = config.get_json("authorized_admins");
    let count = list.as_array().map(|a| a.len()).unwrap_or(0);
    let rows = vec![
        vec![InlineKeyboardButton::callback(
            "Add admin (reply with user id)",
            Callback::Add("authorized_admins".to_string()).to_data(),
        )],
        back_row(),
    ];
    Rendered {
        text: format!("Authorized admins ({count} configured)"),
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

fn render_boards() -> Rendered {
    let rows = vec![
        toggle_row("Admin receipt notifications", "enable_admin_receipt", false),
        back_row(),
    ];
    Rendered {
        text: "Backup & notification boards".to_string(),
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

fn render_quiet_hours(config: &ConfigStore) -> Rendered {
    let busy = config.get_bool("busy_mode");
    let enable_verify = config.get_bool("enable_verify");
    let captcha_mode: CaptchaMode = config.get("captcha_mode").parse().unwrap_or(CaptchaMode::Off);
    let verify_label = if enable_verify {
        format!("Verification: on ({captcha_mode}, tap to rotate)")
    } else {
        "Verification: off (tap to rotate)".to_string()
    };
    let rows = vec![
        toggle_row("Busy mode", "busy_mode", busy),
        vec![InlineKeyboardButton::callback(
            "Edit busy message",
            Callback::Edit("busy_msg".to_string()).to_data(),
        )],
        vec![InlineKeyboardButton::callback(verify_label, Callback::RotateMode.to_data())],
        back_row(),
    ];
    Rendered {
        text: "Quiet hours & verification".to_string(),
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}
