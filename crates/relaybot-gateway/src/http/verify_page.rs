//! GET /verify?user_id=<id> — the verification mini app page.
//!
//! Served as a static HTML document embedding whichever captcha widget is
//! currently active plus the Telegram WebApp bootstrap script. The page
//! itself does no verification — it just collects a captcha token and the
//! mini app's `initData`, then posts both to `/submit_token`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use serde::Deserialize;

use relaybot_core::types::CaptchaMode;

use crate::app::AppState;

#[derive(Deserialize)]
pub struct VerifyQuery {
    pub user_id: String,
}

pub async fn verify_page_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyQuery>,
) -> Result<Html<String>, StatusCode> {
    let mode: CaptchaMode = state.engine.store().config.get("captcha_mode").parse().unwrap_or(CaptchaMode::Off);

    let widget = match mode {
        CaptchaMode::Off => String::new(),
        CaptchaMode::Turnstile => {
            let site_key = state.config.captcha.turnstile_site_key.clone().ok_or(StatusCode::BAD_REQUEST)?;
            format!(
                r#"<script src="https://challenges.cloudflare.com/turnstile/v0/api.js" async defer></script>
<div class="cf-turnstile" data-sitekey="{site_key}" data-callback="onToken"></div>"#
            )
        }
        CaptchaMode::Recaptcha => {
            let site_key = state.config.captcha.recaptcha_site_key.clone().ok_or(StatusCode::BAD_REQUEST)?;
            format!(
                r#"<script src="https://www.google.com/recaptcha/api.js" async defer></script>
<div class="g-recaptcha" data-sitekey="{site_key}" data-callback="onToken"></div>"#
            )
        }
    };

    let user_id = html_escape(&query.user_id);
    let page = format!(
        r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8">
  <title>Verification</title>
  <script src="https://telegram.org/js/telegram-web-app.js"></script>
</head>
<body>
  <h3>Please complete verification to continue.</h3>
  {widget}
  <script>
    const tg = window.Telegram?.WebApp;
    function onToken(token) {{
      fetch('/submit_token', {{
        method: 'POST',
        headers: {{ 'Content-Type': 'application/json' }},
        body: JSON.stringify({{
          user_id: "{user_id}",
          token: token,
          init_data: tg ? tg.initData : ""
        }})
      }}).then(() => {{ if (tg) tg.close(); }});
    }}
  </script>
</body>
</html>"#
    );

    Ok(Html(page))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_escape_neutralizes_tags_and_quotes() {
        assert_eq!(html_escape("<script>\"x\"</script>"), "&lt;script&gt;&quot;x&quot;&lt;/script&gt;");
    }
}
