//! Turnstile / reCAPTCHA siteverify client.

use serde::Deserialize;
use tracing::warn;

use relaybot_core::config::CaptchaSecrets;
use relaybot_core::types::CaptchaMode;

use crate::error::{Result, VerifyError};

const TURNSTILE_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";
const RECAPTCHA_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

pub struct CaptchaVerifier {
    client: reqwest::Client,
}

impl CaptchaVerifier {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Verify `token` against the provider selected by `mode`.
    ///
    /// Callers must not invoke this when `mode` is `Off` — there's nothing to
    /// verify and no secret to check it against.
    pub async fn verify(&self, mode: CaptchaMode, secrets: &CaptchaSecrets, token: &str) -> Result<()> {
        let (url, secret) = match mode {
            CaptchaMode::Off => return Ok(()),
            CaptchaMode::Turnstile => (
                TURNSTILE_URL,
                secrets.turnstile_secret_key.as_deref().ok_or(VerifyError::NoSecret)?,
            ),
            CaptchaMode::Recaptcha => (
                RECAPTCHA_URL,
                secrets.recaptcha_secret_key.as_deref().ok_or(VerifyError::NoSecret)?,
            ),
        };

        let resp: SiteverifyResponse = match mode {
            CaptchaMode::Turnstile => {
                self.client
                    .post(url)
                    .json(&serde_json::json!({ "secret": secret, "response": token }))
                    .send()
                    .await?
                    .json()
                    .await?
            }
            _ => {
                self.client
                    .post(url)
                    .form(&[("secret", secret), ("response", token)])
                    .send()
                    .await?
                    .json()
                    .await?
            }
        };

        if resp.success {
            Ok(())
        } else {
            warn!(error_codes = ?resp.error_codes, "captcha provider rejected token");
            Err(VerifyError::CaptchaRejected)
        }
    }
}

impl Default for CaptchaVerifier {
    fn default() -> Self {
        Self::new()
    }
}
