//! POST /submit_token — the mini app's callback once the user has solved
//! the captcha widget and Telegram has handed it `initData`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use relaybot_core::types::{CaptchaMode, UserState};
use relaybot_verify::VerifyError;

use crate::app::AppState;

#[derive(Deserialize)]
pub struct SubmitTokenRequest {
    pub user_id: String,
    pub token: String,
    pub init_data: String,
}

#[derive(Serialize)]
pub struct SubmitTokenResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn submit_token_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitTokenRequest>,
) -> Result<Json<SubmitTokenResponse>, SubmitTokenError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let verified = relaybot_verify::verify_init_data(&body.init_data, &state.config.bot_token, now)?;
    if verified.user_id != body.user_id {
        warn!(claimed = %body.user_id, verified = %verified.user_id, "submit_token user_id mismatch");
        return Err(SubmitTokenError::UserMismatch);
    }

    let store = state.engine.store();
    let user = store.users.get_or_create(&verified.user_id)?;

    let mode: CaptchaMode = store.config.get("captcha_mode").parse().unwrap_or(CaptchaMode::Off);
    if mode != CaptchaMode::Off {
        state.captcha.verify(mode, &state.config.captcha, &body.token).await?;
    }

    let enable_qa_verify = store.config.get_bool("enable_qa_verify");
    let next_state = if enable_qa_verify {
        UserState::PendingVerification
    } else {
        UserState::Verified
    };
    store.users.set_state(&user.id, next_state)?;

    if next_state == UserState::Verified {
        state.engine.ensure_topic(&user.id, &display_name(&user)).await?;
    }

    Ok(Json(SubmitTokenResponse {
        success: true,
        error: None,
    }))
}

fn display_name(user: &relaybot_store::types::User) -> String {
    if user.info.display_name.is_empty() {
        user.id.clone()
    } else {
        user.info.display_name.clone()
    }
}

pub enum SubmitTokenError {
    Verify(VerifyError),
    UserMismatch,
    Store(relaybot_store::error::StoreError),
    Relay(relaybot_relay::RelayError),
}

impl From<VerifyError> for SubmitTokenError {
    fn from(e: VerifyError) -> Self {
        SubmitTokenError::Verify(e)
    }
}

impl From<relaybot_store::error::StoreError> for SubmitTokenError {
    fn from(e: relaybot_store::error::StoreError) -> Self {
        SubmitTokenError::Store(e)
    }
}

impl From<relaybot_relay::RelayError> for SubmitTokenError {
    fn from(e: relaybot_relay::RelayError) -> Self {
        SubmitTokenError::Relay(e)
    }
}

impl SubmitTokenError {
    fn reason(&self) -> String {
        match self {
            SubmitTokenError::Verify(e) => e.to_string(),
            SubmitTokenError::UserMismatch => "user_id does not match initData".to_string(),
            SubmitTokenError::Store(e) => e.to_string(),
            SubmitTokenError::Relay(e) => e.to_string(),
        }
    }
}

impl IntoResponse for SubmitTokenError {
    fn into_response(self) -> Response {
        let body = SubmitTokenResponse {
            success: false,
            error: Some(self.reason()),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}
