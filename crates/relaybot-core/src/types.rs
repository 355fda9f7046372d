use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Admission pipeline state. `blocked` is a separate overlay
/// flag on `User`, orthogonal to this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserState {
    New,
    PendingTurnstile,
    PendingVerification,
    Verified,
}

impl Default for UserState {
    fn default() -> Self {
        UserState::New
    }
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserState::New => "new",
            UserState::PendingTurnstile => "pending_turnstile",
            UserState::PendingVerification => "pending_verification",
            UserState::Verified => "verified",
        };
        write!(f, "{s}")
    }
}

impl FromStr for UserState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(UserState::New),
            "pending_turnstile" => Ok(UserState::PendingTurnstile),
            "pending_verification" => Ok(UserState::PendingVerification),
            "verified" => Ok(UserState::Verified),
            other => Err(format!("unknown user_state: {other}")),
        }
    }
}

/// Which captcha provider is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptchaMode {
    Off,
    Turnstile,
    Recaptcha,
}

impl CaptchaMode {
    /// Rotates the `(enable_verify, captcha_mode)` pair as a unit:
    /// on+turnstile -> on+recaptcha -> off (widget unchanged) -> on+turnstile.
    /// `captcha_mode` never reads `Off` once rotation starts; `Off` only
    /// stands for the unconfigured default before the first rotation.
    pub fn rotate_verification(enable_verify: bool, mode: CaptchaMode) -> (bool, CaptchaMode) {
        if !enable_verify {
            return (true, CaptchaMode::Turnstile);
        }
        match mode {
            CaptchaMode::Off | CaptchaMode::Turnstile => (true, CaptchaMode::Recaptcha),
            CaptchaMode::Recaptcha => (false, CaptchaMode::Recaptcha),
        }
    }
}

impl fmt::Display for CaptchaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CaptchaMode::Off => "off",
            CaptchaMode::Turnstile => "turnstile",
            CaptchaMode::Recaptcha => "recaptcha",
        };
        write!(f, "{s}")
    }
}

impl FromStr for CaptchaMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(CaptchaMode::Off),
            "turnstile" => Ok(CaptchaMode::Turnstile),
            "recaptcha" => Ok(CaptchaMode::Recaptcha),
            other => Err(format!("unknown captcha_mode: {other}")),
        }
    }
}

/// Typed-content classification, in forwarding-gate priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    ForwardedUser,
    ForwardedGroup,
    ForwardedChannel,
    AudioVoice,
    StickerAnimation,
    Media,
    Link,
    Text,
}

impl ContentKind {
    /// The `enable_*_forwarding` config key gating this content kind.
    pub fn switch_key(self) -> &'static str {
        match self {
            ContentKind::ForwardedUser | ContentKind::ForwardedGroup | ContentKind::ForwardedChannel => {
                "enable_forward_forwarding"
            }
            ContentKind::AudioVoice => "enable_audio_forwarding",
            ContentKind::StickerAnimation => "enable_sticker_forwarding",
            ContentKind::Media => "enable_media_forwarding",
            ContentKind::Link => "enable_link_forwarding",
            ContentKind::Text => "enable_text_forwarding",
        }
    }

    /// Forwarded-from-channel has an additional gate beyond the plain forward switch.
    pub fn needs_channel_switch(self) -> bool {
        matches!(self, ContentKind::ForwardedChannel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_state_roundtrips_through_string() {
        for s in [
            UserState::New,
            UserState::PendingTurnstile,
            UserState::PendingVerification,
            UserState::Verified,
        ] {
            let parsed: UserState = s.to_string().parse().unwrap();
            assert_eq!(parsed, s);
        }
    }

    #[test]
    fn verification_rotation_cycles_enable_and_mode_together() {
        let state = (true, CaptchaMode::Turnstile);
        let state = CaptchaMode::rotate_verification(state.0, state.1);
        assert_eq!(state, (true, CaptchaMode::Recaptcha));

        let state = CaptchaMode::rotate_verification(state.0, state.1);
        assert_eq!(state, (false, CaptchaMode::Recaptcha));

        let state = CaptchaMode::rotate_verification(state.0, state.1);
        assert_eq!(state, (true, CaptchaMode::Turnstile));
    }

    #[test]
    fn verification_rotation_from_unconfigured_default_starts_at_turnstile() {
        assert_eq!(
            CaptchaMode::rotate_verification(false, CaptchaMode::Off),
            (true, CaptchaMode::Turnstile)
        );
    }

    #[test]
    fn content_kind_switch_keys() {
        assert_eq!(ContentKind::Text.switch_key(), "enable_text_forwarding");
        assert_eq!(ContentKind::ForwardedChannel.switch_key(), "enable_forward_forwarding");
        assert!(ContentKind::ForwardedChannel.needs_channel_switch());
        assert!(!ContentKind::Text.needs_channel_switch());
    }
}
