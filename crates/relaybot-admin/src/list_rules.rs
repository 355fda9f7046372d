//! Add/remove/clear operations for the list-shaped config rules:
//! `block_keywords`, `keyword_responses`, `authorized_admins`.

use serde_json::Value;

use relaybot_core::config::KEYWORD_MAX_LEN;
use relaybot_store::ConfigStore;

use relaybot_relay::policy::AutoReplyRule;

use crate::error::{AdminError, Result};

pub fn add_block_keyword(config: &ConfigStore, keyword: &str) -> Result<()> {
    let keyword: String = keyword.chars().take(KEYWORD_MAX_LEN).collect();
    let mut list = string_list(config, "block_keywords");
    if !list.iter().any(|k| k.eq_ignore_ascii_case(&keyword)) {
        list.push(keyword);
    }
    set_string_list(config, "block_keywords", &list)
}

pub fn del_block_keyword(config: &ConfigStore, keyword: &str) -> Result<()> {
    let mut list = string_list(config, "block_keywords");
    list.retain(|k| !k.eq_ignore_ascii_case(keyword));
    set_string_list(config, "block_keywords", &list)
}

pub fn clear_block_keywords(config: &ConfigStore) -> Result<()> {
    set_string_list(config, "block_keywords", &[])
}

/// Parse the admin's `trigger===reply` input and append it as a rule.
pub fn add_auto_reply(config: &ConfigStore, raw_input: &str) -> Result<()> {
    let (trigger, reply) = raw_input
        .split_once("===")
        .ok_or_else(|| AdminError::BadCallback("expected trigger===reply".to_string()))?;
    let rule = AutoReplyRule {
        trigger: trigger.trim().to_string(),
        reply: reply.trim().to_string(),
    };
    let mut rules = auto_reply_list(config);
    rules.retain(|r| !r.trigger.eq_ignore_ascii_case(&rule.trigger));
    rules.push(rule);
    set_auto_reply_list(config, &rules)
}

pub fn del_auto_reply(config: &ConfigStore, trigger: &str) -> Result<()> {
    let mut rules = auto_reply_list(config);
    rules.retain(|r| !r.trigger.eq_ignore_ascii_case(trigger));
    set_auto_reply_list(config, &rules)
}

pub fn clear_auto_replies(config: &ConfigStore) -> Result<()> {
    set_auto_reply_list(config, &[])
}

pub fn add_authorized_admin(config: &ConfigStore, admin_id: &str) -> Result<()> {
    let mut list = string_list(config, "authorized_admins");
    if !list.iter().any(|id| id == admin_id) {
        list.push(admin_id.to_string());
    }
    set_string_list(config, "authorized_admins", &list)
}

pub fn del_authorized_admin(config: &ConfigStore, admin_id: &str) -> Result<()> {
    let mut list = string_list(config, "authorized_admins");
    list.retain(|id| id != admin_id);
    set_string_list(config, "authorized_admins", &list)
}

pub fn is_authorized_admin(config: &ConfigStore, admin_id: &str) -> bool {
    string_list(config, "authorized_admins").iter().any(|id| id == admin_id)
}

fn string_list(config: &ConfigStore, key: &str) -> Vec<String> {
    config
        .get_json(key)
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn set_string_list(config: &ConfigStore, key: &str, list: &[String]) -> Result<()> {
    let value = Value::Array(list.iter().map(|s| Value::String(s.clone())).collect());
    config.set_json(key, &value)?;
    Ok(())
}

fn auto_reply_list(config: &ConfigStore) -> Vec<AutoReplyRule> {
    config
        .get_json("keyword_responses")
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

fn set_auto_reply_list(config: &ConfigStore, rules: &[AutoReplyRule]) -> Result<()> {
    let value = serde_json::to_value(rules).expect("AutoReplyRule always serializes");
    config.set_json("keyword_responses", &value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> relaybot_store::Store {
        relaybot_store::Store::open_in_memory().unwrap()
    }

    #[test]
    fn add_block_keyword_dedups_case_insensitively() {
        let store = store();
        add_block_keyword(&store.config, "Spam").unwrap();
        add_block_keyword(&store.config, "spam").unwrap();
        assert_eq!(string_list(&store.config, "block_keywords").len(), 1);
    }

    #[test]
    fn del_block_keyword_removes_it() {
        let store = store();
        add_block_keyword(&store.config, "spam").unwrap();
        del_block_keyword(&store.config, "SPAM").unwrap();
        assert!(string_list(&store.config, "block_keywords").is_empty());
    }

    #[test]
    fn clear_block_keywords_empties_the_list() {
        let store = store();
        add_block_keyword(&store.config, "a").unwrap();
        add_block_keyword(&store.config, "b").unwrap();
        clear_block_keywords(&store.config).unwrap();
        assert!(string_list(&store.config, "block_keywords").is_empty());
    }

    #[test]
    fn add_auto_reply_parses_delimited_input() {
        let store = store();
        add_auto_reply(&store.config, "price === see our pricing page").unwrap();
        let rules = auto_reply_list(&store.config);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].trigger, "price");
        assert_eq!(rules[0].reply, "see our pricing page");
    }

    #[test]
    fn add_auto_reply_rejects_missing_delimiter() {
        let store = store();
        assert!(add_auto_reply(&store.config, "no delimiter here").is_err());
    }

    #[test]
    fn add_auto_reply_replaces_existing_trigger() {
        let store = store();
        add_auto_reply(&store.config, "price===old reply").unwrap();
        add_auto_reply(&store.config, "PRICE===new reply").unwrap();
        let rules = auto_reply_list(&store.config);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].reply, "new reply");
    }

    #[test]
    fn authorized_admin_add_del_roundtrip() {
        let store = store();
        assert!(!is_authorized_admin(&store.config, "99"));
        add_authorized_admin(&store.config, "99").unwrap();
        assert!(is_authorized_admin(&store.config, "99"));
        del_authorized_admin(&store.config, "99").unwrap();
        assert!(!is_authorized_admin(&store.config, "99"));
    }
}
