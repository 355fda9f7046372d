use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use relaybot_core::config::RelayConfig;
use relaybot_relay::RelayEngine;
use relaybot_verify::CaptchaVerifier;

/// Central shared state, passed as `Arc<AppState>` to every Axum handler.
pub struct AppState {
    pub config: RelayConfig,
    pub engine: RelayEngine,
    pub captcha: CaptchaVerifier,
}

impl AppState {
    pub fn new(config: RelayConfig, engine: RelayEngine) -> Self {
        Self {
            config,
            engine,
            captcha: CaptchaVerifier::new(),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(crate::http::health::health_handler))
        .route("/verify", get(crate::http::verify_page::verify_page_handler))
        .route("/submit_token", post(crate::http::submit_token::submit_token_handler))
        .route("/", post(crate::http::webhook::webhook_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
