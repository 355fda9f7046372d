use relaybot_core::types::UserState;
use serde::{Deserialize, Serialize};

/// Typed replacement for an ad-hoc userInfo blob. Partial updates are
/// expressed with [`UserInfoPatch`] and merged field by field — no patch
/// ever silently drops an unrelated field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// Message id of the pinned info card in the user's bound topic.
    #[serde(default)]
    pub card_msg_id: Option<i32>,
    /// Message id of this user's card in the inbox board.
    #[serde(default)]
    pub inbox_msg_id: Option<i32>,
    /// Message id of this user's card in the blacklist board.
    #[serde(default)]
    pub blacklist_msg_id: Option<i32>,
    /// Unix seconds of the last quiet-hours notice sent to this user.
    #[serde(default)]
    pub last_busy_reply: Option<i64>,
    /// Free-form "last notified about X at T" slot, reserved for future use.
    #[serde(default)]
    pub last_notify: Option<i64>,
    /// Unix seconds this user first made contact.
    #[serde(default)]
    pub join_date: Option<i64>,
}

/// Record-of-optionals patch, merged field-by-field onto an existing
/// [`UserInfo`]. `None` means "leave unchanged";
/// there is no way to express "clear this field" except `Some(None)` for
/// the `Option`-typed fields below.
#[derive(Debug, Clone, Default)]
pub struct UserInfoPatch {
    pub display_name: Option<String>,
    pub username: Option<Option<String>>,
    pub note: Option<Option<String>>,
    pub card_msg_id: Option<Option<i32>>,
    pub inbox_msg_id: Option<Option<i32>>,
    pub blacklist_msg_id: Option<Option<i32>>,
    pub last_busy_reply: Option<Option<i64>>,
    pub last_notify: Option<Option<i64>>,
    pub join_date: Option<Option<i64>>,
}

impl UserInfo {
    /// Apply `patch` on top of `self`, field by field.
    pub fn merge(&mut self, patch: UserInfoPatch) {
        if let Some(v) = patch.display_name {
            self.display_name = v;
        }
        if let Some(v) = patch.username {
            self.username = v;
        }
        if let Some(v) = patch.note {
            self.note = v;
        }
        if let Some(v) = patch.card_msg_id {
            self.card_msg_id = v;
        }
        if let Some(v) = patch.inbox_msg_id {
            self.inbox_msg_id = v;
        }
        if let Some(v) = patch.blacklist_msg_id {
            self.blacklist_msg_id = v;
        }
        if let Some(v) = patch.last_busy_reply {
            self.last_busy_reply = v;
        }
        if let Some(v) = patch.last_notify {
            self.last_notify = v;
        }
        if let Some(v) = patch.join_date {
            self.join_date = v;
        }
    }
}

/// Full user record. `id` is the Telegram user id, used verbatim
/// (no internal UUID layer — there's exactly one channel in this system).
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub state: UserState,
    pub is_blocked: bool,
    pub block_count: i64,
    pub topic_id: Option<i64>,
    pub info: UserInfo,
    /// RFC3339, set once at first contact.
    pub created_at: String,
    /// RFC3339, bumped on every row mutation.
    pub updated_at: String,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            state: UserState::New,
            is_blocked: false,
            block_count: 0,
            topic_id: None,
            info: UserInfo::default(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// One relayed text message, kept only to diff later edits.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub user_id: String,
    pub message_id: i64,
    pub text: Option<String>,
    pub date: i64,
}

/// What an admin is in the middle of typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    Input,
    InputNote,
}

/// Transient per-admin input state, persisted under `admin_state:<id>` in
/// the config table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminInputState {
    pub admin_user_id: String,
    pub action: AdminAction,
    /// The config key being edited (`Input`) or the bound user id (`InputNote`).
    pub target: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_only_touches_patched_fields() {
        let mut info = UserInfo {
            display_name: "Alice".into(),
            username: Some("alice".into()),
            note: Some("vip".into()),
            ..Default::default()
        };
        let patch = UserInfoPatch {
            display_name: Some("Alice B".into()),
            ..Default::default()
        };
        info.merge(patch);
        assert_eq!(info.display_name, "Alice B");
        // Untouched fields survive.
        assert_eq!(info.username.as_deref(), Some("alice"));
        assert_eq!(info.note.as_deref(), Some("vip"));
    }

    #[test]
    fn merge_can_clear_an_optional_field() {
        let mut info = UserInfo {
            note: Some("vip".into()),
            ..Default::default()
        };
        let patch = UserInfoPatch {
            note: Some(None),
            ..Default::default()
        };
        info.merge(patch);
        assert_eq!(info.note, None);
    }
}
