//! Verification of Telegram WebApp `initData`.
//!
//! `initData` is a `application/x-www-form-urlencoded` string Telegram hands
//! the mini app. Its authenticity is checked with a double HMAC-SHA256: a
//! secret key derived from the bot token, keyed by the literal string
//! `"WebAppData"`, then used to sign the sorted `key=value` data-check
//! string. See https://core.telegram.org/bots/webapps#validating-data-received-via-the-mini-app.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use relaybot_core::config::INIT_DATA_MAX_AGE_SECS;

use crate::error::{Result, VerifyError};

type HmacSha256 = Hmac<Sha256>;

pub struct VerifiedInitData {
    pub user_id: String,
    pub auth_date: i64,
}

/// Verify `init_data` against `bot_token`, using `now` (Unix seconds) as the
/// freshness reference point.
pub fn verify_init_data(init_data: &str, bot_token: &str, now: i64) -> Result<VerifiedInitData> {
    let pairs = parse_query_string(init_data);

    let hash = pairs
        .iter()
        .find(|(k, _)| k == "hash")
        .map(|(_, v)| v.clone())
        .ok_or(VerifyError::MissingHash)?;

    let mut data_pairs: Vec<(String, String)> =
        pairs.into_iter().filter(|(k, _)| k != "hash").collect();
    data_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let data_check_string = data_pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let secret_key = {
        let mut mac = HmacSha256::new_from_slice(b"WebAppData")
            .expect("HMAC accepts a key of any length");
        mac.update(bot_token.as_bytes());
        mac.finalize().into_bytes()
    };

    let mut mac = HmacSha256::new_from_slice(&secret_key).expect("HMAC accepts a key of any length");
    mac.update(data_check_string.as_bytes());
    let hash_bytes = hex::decode(&hash).map_err(|_| VerifyError::HashMismatch)?;
    // `verify_slice` compares in constant time, unlike a plain `==` on the
    // encoded digests.
    mac.verify_slice(&hash_bytes).map_err(|_| VerifyError::HashMismatch)?;

    let auth_date: i64 = data_pairs
        .iter()
        .find(|(k, _)| k == "auth_date")
        .and_then(|(_, v)| v.parse().ok())
        .ok_or(VerifyError::BadAuthDate)?;

    if now - auth_date > INIT_DATA_MAX_AGE_SECS {
        return Err(VerifyError::Expired);
    }

    let user_id = data_pairs
        .iter()
        .find(|(k, _)| k == "user")
        .and_then(|(_, v)| serde_json::from_str::<serde_json::Value>(v).ok())
        .and_then(|user| user.get("id").and_then(|id| id.as_i64()))
        .map(|id| id.to_string())
        .ok_or(VerifyError::MissingUserId)?;

    Ok(VerifiedInitData { user_id, auth_date })
}

fn parse_query_string(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (percent_decode(k), percent_decode(v)),
            None => (percent_decode(pair), String::new()),
        })
        .collect()
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hex_pair = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex_pair.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(bytes[i]);
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(data_check_string: &str, bot_token: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(b"WebAppData").unwrap();
        mac.update(bot_token.as_bytes());
        let secret_key = mac.finalize().into_bytes();
        let mut mac = HmacSha256::new_from_slice(&secret_key).unwrap();
        mac.update(data_check_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn build_init_data(bot_token: &str, auth_date: i64, user_id: i64) -> String {
        let user = format!("{{\"id\":{user_id}}}");
        let encoded_user = user.replace('"', "%22").replace(':', "%3A").replace(',', "%2C").replace('{', "%7B").replace('}', "%7D");
        let data_check_string = format!("auth_date={auth_date}\nuser={user}");
        let hash = sign(&data_check_string, bot_token);
        format!("auth_date={auth_date}&user={encoded_user}&hash={hash}")
    }

    #[test]
    fn valid_init_data_verifies() {
        let init_data = build_init_data("BOT:TOKEN", 1000, 42);
        let result = verify_init_data(&init_data, "BOT:TOKEN", 1000).unwrap();
        assert_eq!(result.user_id, "42");
        assert_eq!(result.auth_date, 1000);
    }

    #[test]
    fn tampered_payload_fails_hash_check() {
        let init_data = build_init_data("BOT:TOKEN", 1000, 42);
        let tampered = init_data.replace("42", "43");
        let result = verify_init_data(&tampered, "BOT:TOKEN", 1000);
        assert!(matches!(result, Err(VerifyError::HashMismatch)));
    }

    #[test]
    fn wrong_bot_token_fails_hash_check() {
        let init_data = build_init_data("BOT:TOKEN", 1000, 42);
        let result = verify_init_data(&init_data, "OTHER:TOKEN", 1000);
        assert!(matches!(result, Err(VerifyError::HashMismatch)));
    }

    #[test]
    fn stale_auth_date_is_rejected() {
        let init_data = build_init_data("BOT:TOKEN", 1000, 42);
        let now = 1000 + INIT_DATA_MAX_AGE_SECS + 1;
        let result = verify_init_data(&init_data, "BOT:TOKEN", now);
        assert!(matches!(result, Err(VerifyError::Expired)));
    }

    #[test]
    fn missing_hash_is_rejected() {
        let result = verify_init_data("auth_date=1000&user=%7B%22id%22%3A1%7D", "BOT:TOKEN", 1000);
        assert!(matches!(result, Err(VerifyError::MissingHash)));
    }

    #[test]
    fn percent_decode_handles_plus_and_escapes() {
        assert_eq!(percent_decode("a+b%20c"), "a b c");
        assert_eq!(percent_decode("%7B%22id%22%3A1%7D"), "{\"id\":1}");
    }
}
