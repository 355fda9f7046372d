//! GET / — liveness probe. Telegram also posts webhook updates to this path,
//! so health checks must only ever observe GET requests here.

use axum::http::StatusCode;

pub async fn health_handler() -> StatusCode {
    StatusCode::OK
}
