//! Parsing and construction of admin console `callback_data`.
//!
//! Grammar: `config:<verb>:<key>[:<value>]`. The `config:` namespace keeps
//! these callbacks distinguishable from any other inline-keyboard callback
//! the bot might grow later.

use crate::error::{AdminError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuId {
    Base,
    AutoReply,
    BlockKeyword,
    FilterToggles,
    AuthorizedAdmins,
    BackupBoards,
    QuietHours,
}

impl MenuId {
    pub fn as_str(self) -> &'static str {
        match self {
            MenuId::Base => "base",
            MenuId::AutoReply => "auto_reply",
            MenuId::BlockKeyword => "block_keyword",
            MenuId::FilterToggles => "filters",
            MenuId::AuthorizedAdmins => "admins",
            MenuId::BackupBoards => "boards",
            MenuId::QuietHours => "quiet_hours",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "base" => Ok(MenuId::Base),
            "auto_reply" => Ok(MenuId::AutoReply),
            "block_keyword" => Ok(MenuId::BlockKeyword),
            "filters" => Ok(MenuId::FilterToggles),
            "admins" => Ok(MenuId::AuthorizedAdmins),
            "boards" => Ok(MenuId::BackupBoards),
            "quiet_hours" => Ok(MenuId::QuietHours),
            other => Err(AdminError::BadCallback(format!("unknown menu: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Menu(MenuId),
    Toggle(String),
    Edit(String),
    Add(String),
    Del { key: String, value: String },
    Clear(String),
    RotateMode,
}

impl Callback {
    pub fn parse(data: &str) -> Result<Self> {
        let mut parts = data.split(':');
        let ns = parts.next().ok_or_else(|| AdminError::BadCallback(data.to_string()))?;
        if ns != "config" {
            return Err(AdminError::BadCallback(data.to_string()));
        }
        let verb = parts.next().ok_or_else(|| AdminError::BadCallback(data.to_string()))?;
        let key = parts.next();

        match verb {
            "menu" => {
                let key = key.ok_or_else(|| AdminError::BadCallback(data.to_string()))?;
                Ok(Callback::Menu(MenuId::parse(key)?))
            }
            "toggle" => Ok(Callback::Toggle(required(key, data)?)),
            "edit" => Ok(Callback::Edit(required(key, data)?)),
            "add" => Ok(Callback::Add(required(key, data)?)),
            "cl" => Ok(Callback::Clear(required(key, data)?)),
            "rotate_mode" => Ok(Callback::RotateMode),
            "del" => {
                let key = required(key, data)?;
                let value = parts.next().ok_or_else(|| AdminError::BadCallback(data.to_string()))?;
                Ok(Callback::Del {
                    key,
                    value: value.to_string(),
                })
            }
            other => Err(AdminError::BadCallback(format!("unknown verb: {other}"))),
        }
    }

    pub fn to_data(&self) -> String {
        match self {
            Callback::Menu(id) => format!("config:menu:{}", id.as_str()),
            Callback::Toggle(key) => format!("config:toggle:{key}"),
            Callback::Edit(key) => format!("config:edit:{key}"),
            Callback::Add(key) => format!("config:add:{key}"),
            Callback::Clear(key) => format!("config:cl:{key}"),
            Callback::Del { key, value } => format!("config:del:{key}:{value}"),
            Callback::RotateMode => "config:rotate_mode".to_string(),
        }
    }
}

fn required(part: Option<&str>, data: &str) -> Result<String> {
    part.map(str::to_string)
        .ok_or_else(|| AdminError::BadCallback(data.to_string()))
}
