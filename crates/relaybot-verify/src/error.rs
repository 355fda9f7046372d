#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("http error calling captcha provider: {0}")]
    Http(#[from] reqwest::Error),

    #[error("captcha provider rejected the token")]
    CaptchaRejected,

    #[error("no secret configured for the active captcha provider")]
    NoSecret,

    #[error("initData is missing the hash field")]
    MissingHash,

    #[error("initData hash mismatch")]
    HashMismatch,

    #[error("initData auth_date is missing or unparsable")]
    BadAuthDate,

    #[error("initData auth_date is too old")]
    Expired,

    #[error("initData is missing the user_id field")]
    MissingUserId,
}

pub type Result<T> = std::result::Result<T, VerifyError>;
