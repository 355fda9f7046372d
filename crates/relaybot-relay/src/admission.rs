//! User admission state machine: `new -> pending_turnstile |
//! pending_verification -> verified`. `is_blocked` is a separate overlay
//! checked independently of state.

use relaybot_core::types::{CaptchaMode, UserState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionStep {
    /// Let the message through the pipeline (the user is fully verified).
    Verified,
    /// Show the captcha challenge page; user stays `pending_turnstile`.
    NeedsCaptcha,
    /// Show the QA challenge; user stays `pending_verification`.
    NeedsQuestion,
    /// Verification is disabled — treat every new contact as verified.
    SkipVerification,
}

/// Decide the next admission step for a user currently in `state`, given the
/// operator's current verification settings.
pub fn next_step(state: UserState, enable_verify: bool, enable_qa_verify: bool, captcha_mode: CaptchaMode) -> AdmissionStep {
    if state == UserState::Verified {
        return AdmissionStep::Verified;
    }
    if !enable_verify && !enable_qa_verify {
        return AdmissionStep::SkipVerification;
    }
    if enable_verify && captcha_mode != CaptchaMode::Off {
        return AdmissionStep::NeedsCaptcha;
    }
    if enable_qa_verify {
        return AdmissionStep::NeedsQuestion;
    }
    AdmissionStep::SkipVerification
}

/// The `UserState` a brand-new contact should be moved into when admission
/// begins, mirroring [`next_step`]'s choice of challenge.
pub fn initial_pending_state(enable_verify: bool, enable_qa_verify: bool, captcha_mode: CaptchaMode) -> UserState {
    if enable_verify && captcha_mode != CaptchaMode::Off {
        UserState::PendingTurnstile
    } else if enable_qa_verify {
        UserState::PendingVerification
    } else {
        UserState::Verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verified_user_always_passes() {
        assert_eq!(
            next_step(UserState::Verified, true, true, CaptchaMode::Turnstile),
            AdmissionStep::Verified
        );
    }

    #[test]
    fn verification_disabled_skips_straight_through() {
        assert_eq!(
            next_step(UserState::New, false, false, CaptchaMode::Off),
            AdmissionStep::SkipVerification
        );
    }

    #[test]
    fn captcha_mode_takes_priority_over_qa() {
        assert_eq!(
            next_step(UserState::New, true, true, CaptchaMode::Recaptcha),
            AdmissionStep::NeedsCaptcha
        );
    }

    #[test]
    fn qa_only_when_captcha_mode_is_off() {
        assert_eq!(
            next_step(UserState::New, true, true, CaptchaMode::Off),
            AdmissionStep::NeedsQuestion
        );
    }

    #[test]
    fn initial_pending_state_matches_next_step_choice() {
        assert_eq!(
            initial_pending_state(true, false, CaptchaMode::Turnstile),
            UserState::PendingTurnstile
        );
        assert_eq!(
            initial_pending_state(false, true, CaptchaMode::Off),
            UserState::PendingVerification
        );
        assert_eq!(initial_pending_state(false, false, CaptchaMode::Off), UserState::Verified);
    }
}
