pub mod captcha;
pub mod error;
pub mod initdata;

pub use captcha::CaptchaVerifier;
pub use error::VerifyError;
pub use initdata::{verify_init_data, VerifiedInitData};
