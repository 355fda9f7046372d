//! Content policy pipeline: block-keywords -> typed-content switches ->
//! auto-reply -> quiet-hours notice -> relay.
//!
//! Each stage can suppress relaying outright (block-keyword, disabled
//! content switch) or let the message through while attaching a side-effect
//! reply (auto-reply match, quiet-hours notice). Stages run in this fixed
//! order because a blocked/disabled message should never trigger an
//! auto-reply or a busy notice.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::info;

use relaybot_core::config::{KEYWORD_MAX_LEN, MESSAGE_TRUNCATE_LEN};
use relaybot_core::types::ContentKind;
use relaybot_store::ConfigStore;
use relaybot_store::UserStore;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoReplyRule {
    pub trigger: String,
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// Relay the message. `auto_reply` is a canned reply to send back to the
    /// sender in addition to relaying, if an auto-reply rule matched.
    Allow { auto_reply: Option<String> },
    /// Drop the message silently; threshold not yet crossed.
    Suppressed { reason: &'static str },
    /// Drop the message and the sender just crossed the violation threshold.
    Blocked,
}

pub struct PolicyEngine<'a> {
    config: &'a ConfigStore,
    users: &'a UserStore,
}

impl<'a> PolicyEngine<'a> {
    pub fn new(config: &'a ConfigStore, users: &'a UserStore) -> Self {
        Self { config, users }
    }

    /// Evaluate the pipeline for one inbound message from `user_id`. `is_admin`
    /// lets an authorized admin bypass the typed-content switches (block
    /// keywords and auto-reply still apply to everyone).
    pub fn evaluate(&self, user_id: &str, kind: ContentKind, text: Option<&str>, is_admin: bool) -> Result<PolicyOutcome> {
        if let Some(text) = text {
            if let Some(outcome) = self.check_block_keywords(user_id, text)? {
                return Ok(outcome);
            }
        }

        if !is_admin {
            if let Some(outcome) = self.check_content_switch(kind) {
                return Ok(outcome);
            }
        }

        let auto_reply = text.and_then(|t| self.match_auto_reply(t));
        Ok(PolicyOutcome::Allow { auto_reply })
    }

    fn check_block_keywords(&self, user_id: &str, text: &str) -> Result<Option<PolicyOutcome>> {
        let truncated: String = text.chars().take(MESSAGE_TRUNCATE_LEN).collect();
        let keywords = self.config.get_json("block_keywords");
        let hit = keywords
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|v| v.as_str())
            .any(|kw| pattern_matches(kw, &truncated));

        if !hit {
            return Ok(None);
        }

        let threshold: i64 = self.config.get("block_keyword_threshold").parse().unwrap_or(5);
        let crossed = self.users.record_violation(user_id, threshold)?;
        if crossed {
            self.users.set_blocked(user_id, true)?;
            info!(user_id, "block-keyword threshold crossed, user blocked");
            Ok(Some(PolicyOutcome::Blocked))
        } else {
            Ok(Some(PolicyOutcome::Suppressed {
                reason: "block_keyword",
            }))
        }
    }

    fn check_content_switch(&self, kind: ContentKind) -> Option<PolicyOutcome> {
        if !self.config.get_bool(kind.switch_key()) {
            return Some(PolicyOutcome::Suppressed {
                reason: "content_switch",
            });
        }
        if kind.needs_channel_switch() && !self.config.get_bool("enable_channel_forwarding") {
            return Some(PolicyOutcome::Suppressed {
                reason: "channel_switch",
            });
        }
        None
    }

    fn match_auto_reply(&self, text: &str) -> Option<String> {
        let rules = self.config.get_json("keyword_responses");
        rules.as_array()?.iter().find_map(|v| {
            let rule: AutoReplyRule = serde_json::from_value(v.clone()).ok()?;
            if pattern_matches(&rule.trigger, text) {
                Some(rule.reply)
            } else {
                None
            }
        })
    }
}

/// Compile `pattern` as a case-insensitive regex and test it against
/// `haystack`. Empty, over-length, or unparsable patterns never match and
/// never raise — user-supplied patterns are untrusted input, not a reason
/// to abort the pipeline.
fn pattern_matches(pattern: &str, haystack: &str) -> bool {
    if pattern.is_empty() || pattern.len() > KEYWORD_MAX_LEN {
        return false;
    }
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}

/// Whether a quiet-hours notice should be sent now, given the last time one
/// was sent to this user (`last_busy_reply`, Unix seconds) and `now`.
pub fn should_send_quiet_hours_notice(busy_mode: bool, last_busy_reply: Option<i64>, now: i64) -> bool {
    if !busy_mode {
        return false;
    }
    match last_busy_reply {
        None => true,
        Some(last) => now - last >= relaybot_core::config::QUIET_HOURS_COOLDOWN_SECS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores() -> (relaybot_store::Store,) {
        (relaybot_store::Store::open_in_memory().unwrap(),)
    }

    #[test]
    fn block_keyword_suppresses_until_threshold() {
        let (store,) = stores();
        store.config.set("block_keywords", "[\"spam\"]").unwrap();
        store.config.set("block_keyword_threshold", "2").unwrap();
        store.users.get_or_create("1").unwrap();
        let policy = PolicyEngine::new(&store.config, &store.users);

        let first = policy
            .evaluate("1", ContentKind::Text, Some("this is SPAM"), false)
            .unwrap();
        assert_eq!(
            first,
            PolicyOutcome::Suppressed {
                reason: "block_keyword"
            }
        );

        let second = policy
            .evaluate("1", ContentKind::Text, Some("spam again"), false)
            .unwrap();
        assert_eq!(second, PolicyOutcome::Blocked);
    }

    #[test]
    fn disabled_content_switch_suppresses() {
        let (store,) = stores();
        store.config.set("enable_text_forwarding", "false").unwrap();
        store.users.get_or_create("1").unwrap();
        let policy = PolicyEngine::new(&store.config, &store.users);
        let outcome = policy.evaluate("1", ContentKind::Text, Some("hi"), false).unwrap();
        assert_eq!(
            outcome,
            PolicyOutcome::Suppressed {
                reason: "content_switch"
            }
        );
    }

    #[test]
    fn admin_bypasses_disabled_content_switch() {
        let (store,) = stores();
        store.config.set("enable_text_forwarding", "false").unwrap();
        store.users.get_or_create("1").unwrap();
        let policy = PolicyEngine::new(&store.config, &store.users);
        let outcome = policy.evaluate("1", ContentKind::Text, Some("hi"), true).unwrap();
        assert_eq!(outcome, PolicyOutcome::Allow { auto_reply: None });
    }

    #[test]
    fn forwarded_channel_requires_both_switches() {
        let (store,) = stores();
        store.config.set("enable_forward_forwarding", "true").unwrap();
        store.config.set("enable_channel_forwarding", "false").unwrap();
        store.users.get_or_create("1").unwrap();
        let policy = PolicyEngine::new(&store.config, &store.users);
        let outcome = policy
            .evaluate("1", ContentKind::ForwardedChannel, None, false)
            .unwrap();
        assert_eq!(
            outcome,
            PolicyOutcome::Suppressed {
                reason: "channel_switch"
            }
        );
    }

    #[test]
    fn auto_reply_rule_matches_case_insensitively() {
        let (store,) = stores();
        store
            .config
            .set(
                "keyword_responses",
                "[{\"trigger\":\"price\",\"reply\":\"see our pricing page\"}]",
            )
            .unwrap();
        store.users.get_or_create("1").unwrap();
        let policy = PolicyEngine::new(&store.config, &store.users);
        let outcome = policy
            .evaluate("1", ContentKind::Text, Some("what's the PRICE?"), false)
            .unwrap();
        assert_eq!(
            outcome,
            PolicyOutcome::Allow {
                auto_reply: Some("see our pricing page".to_string())
            }
        );
    }

    #[test]
    fn invalid_block_keyword_pattern_is_ignored_not_raised() {
        let (store,) = stores();
        store.config.set("block_keywords", "[\"(unterminated\"]").unwrap();
        store.users.get_or_create("1").unwrap();
        let policy = PolicyEngine::new(&store.config, &store.users);
        let outcome = policy.evaluate("1", ContentKind::Text, Some("hello"), false).unwrap();
        assert_eq!(outcome, PolicyOutcome::Allow { auto_reply: None });
    }

    #[test]
    fn quiet_hours_respects_cooldown() {
        assert!(should_send_quiet_hours_notice(true, None, 1000));
        assert!(!should_send_quiet_hours_notice(true, Some(900), 1000));
        assert!(should_send_quiet_hours_notice(true, Some(0), 1000));
        assert!(!should_send_quiet_hours_notice(false, None, 1000));
    }
}
