//! Email + OTP sign-in flow.
//!
//! [`AuthFlow`] drives an [`AuthFsm`] and owns its side effects: sending the
//! OTP, verifying it, persisting and clearing the token. Input is validated
//! before any network call.

use std::sync::Arc;

use mtchat_core::api::{CurrentUser, EntityApi};
use mtchat_core::auth::{AuthEvent, AuthFsm, AuthState, OtpCode, validate_email};
use mtchat_core::notice::{Notifier, Toast};
use mtchat_core::session::TokenStore;
use mtchat_core::{MtchatError, Result};

/// One user's sign-in session.
pub struct AuthFlow {
    api: Arc<dyn EntityApi>,
    tokens: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
    fsm: AuthFsm,
    email: Option<String>,
    user: Option<CurrentUser>,
}

impl AuthFlow {
    pub fn new(
        api: Arc<dyn EntityApi>,
        tokens: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            tokens,
            notifier,
            fsm: AuthFsm::new(),
            email: None,
            user: None,
        }
    }

    pub fn state(&self) -> AuthState {
        self.fsm.current_state()
    }

    /// Email the OTP was sent to.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// User resolved by the last successful [`AuthFlow::restore`] or sign-in.
    pub fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    fn fail(&self, title: &str, error: MtchatError) -> MtchatError {
        self.notifier.notify(Toast::error(title, error.to_string()));
        error
    }

    /// `unauth -> emailForm`.
    pub fn start_sign_in(&mut self) -> Result<AuthState> {
        self.fsm.apply(AuthEvent::StartSignIn)
    }

    /// Validates `input` and requests an OTP; moves to `otpForm` on success.
    ///
    /// Invalid input fails without touching the network. On API failure the
    /// state stays `emailForm`.
    pub async fn submit_email(&mut self, input: &str) -> Result<AuthState> {
        if self.state() != AuthState::EmailForm {
            return Err(MtchatError::InvalidTransition {
                from: self.state().to_string(),
                to: AuthState::OtpForm.to_string(),
            });
        }
        let email = validate_email(input).map_err(|e| self.fail("Invalid email", e))?;

        tracing::info!("[AuthFlow] Sending OTP");
        self.api
            .send_otp(&email)
            .await
            .map_err(|e| self.fail("Error", e))?;

        self.email = Some(email);
        self.notifier.notify(Toast::info(
            "OTP Sent",
            "Please check your email for the verification code.",
        ));
        self.fsm.apply(AuthEvent::OtpSent)
    }

    /// Validates the six-digit code, verifies it and stores the token.
    ///
    /// Malformed codes fail without a network call and leave the state at
    /// `otpForm`.
    pub async fn submit_otp(&mut self, input: &str) -> Result<AuthState> {
        let email = match (self.state(), self.email.clone()) {
            (AuthState::OtpForm, Some(email)) => email,
            (state, _) => {
                return Err(MtchatError::InvalidTransition {
                    from: state.to_string(),
                    to: AuthState::Authenticated.to_string(),
                });
            }
        };
        let otp = OtpCode::parse(input).map_err(|e| self.fail("Invalid code", e))?;

        let token = self
            .api
            .verify_otp(&email, &otp)
            .await
            .and_then(|response| response.into_token())
            .map_err(|e| self.fail("Error", e))?;

        self.tokens.set_token(&token);
        tracing::info!("[AuthFlow] Signed in");
        self.notifier
            .notify(Toast::info("Success", "You have been signed in."));
        self.fsm.apply(AuthEvent::OtpVerified)
    }

    /// `otpForm -> emailForm`.
    pub fn back_to_email(&mut self) -> Result<AuthState> {
        self.fsm.apply(AuthEvent::BackToEmail)
    }

    pub fn open_listing(&mut self) -> Result<AuthState> {
        self.fsm.apply(AuthEvent::OpenListing)
    }

    pub fn open_creating(&mut self) -> Result<AuthState> {
        self.fsm.apply(AuthEvent::OpenCreating)
    }

    /// `listing | creating -> authenticated`.
    pub fn finish(&mut self) -> Result<AuthState> {
        self.fsm.apply(AuthEvent::Done)
    }

    /// Abandons a sign-in in progress.
    pub fn cancel(&mut self) -> AuthState {
        self.email = None;
        self.fsm.reset()
    }

    /// Clears the token and returns to `unauth` from any signed-in state.
    pub fn logout(&mut self) -> Result<AuthState> {
        if !self.state().is_signed_in() {
            return Err(MtchatError::InvalidTransition {
                from: self.state().to_string(),
                to: AuthState::Unauth.to_string(),
            });
        }
        if self.state() != AuthState::Authenticated {
            self.fsm.apply(AuthEvent::Done)?;
        }
        self.tokens.clear_token();
        self.user = None;
        self.email = None;
        tracing::info!("[AuthFlow] Signed out");
        self.fsm.apply(AuthEvent::Logout)
    }

    /// Revalidates a stored token against `auth/me`.
    ///
    /// A token is only a claim; on failure it is cleared and the flow ends in
    /// `unauth`.
    pub async fn restore(&mut self) -> AuthState {
        if !self.tokens.has_token() {
            self.fsm.reset();
            return self.state();
        }
        match self.api.current_user().await {
            Ok(user) => {
                tracing::debug!("[AuthFlow] Restored session for {}", user.audit_id());
                self.user = Some(user);
                self.fsm = AuthFsm::with_state(AuthState::Authenticated);
            }
            Err(e) => {
                tracing::warn!("[AuthFlow] Stored session rejected: {}", e);
                self.tokens.clear_token();
                self.user = None;
                self.fsm.reset();
            }
        }
        self.state()
    }

    /// Called after the gateway reported `SessionExpired`.
    pub fn handle_session_expired(&mut self) -> AuthState {
        self.tokens.clear_token();
        self.user = None;
        self.email = None;
        self.fsm.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryTokens, MockApi, RecordingNotifier};

    fn flow(api: Arc<MockApi>) -> (AuthFlow, Arc<MemoryTokens>, Arc<RecordingNotifier>) {
        let tokens = Arc::new(MemoryTokens::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let flow = AuthFlow::new(api, tokens.clone(), notifier.clone());
        (flow, tokens, notifier)
    }

    #[tokio::test]
    async fn test_full_sign_in_stores_token() {
        let api = MockApi::new();
        let (mut flow, tokens, _) = flow(api.clone());

        flow.start_sign_in().unwrap();
        assert_eq!(
            flow.submit_email(" user@example.com ").await.unwrap(),
            AuthState::OtpForm
        );
        assert_eq!(flow.email(), Some("user@example.com"));
        assert_eq!(
            flow.submit_otp("123456").await.unwrap(),
            AuthState::Authenticated
        );
        assert_eq!(tokens.token().as_deref(), Some("tok-1"));
        assert_eq!(api.calls("verify_otp"), 1);
    }

    #[tokio::test]
    async fn test_malformed_otp_never_hits_network() {
        let api = MockApi::new();
        let (mut flow, tokens, notifier) = flow(api.clone());
        flow.start_sign_in().unwrap();
        flow.submit_email("user@example.com").await.unwrap();

        for input in ["12345", "12a456", "1234567", ""] {
            let err = flow.submit_otp(input).await.unwrap_err();
            assert!(err.is_validation());
            assert_eq!(flow.state(), AuthState::OtpForm);
        }
        assert_eq!(api.calls("verify_otp"), 0);
        assert!(tokens.token().is_none());
        assert_eq!(notifier.toasts.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_invalid_email_never_hits_network() {
        let api = MockApi::new();
        let (mut flow, _, _) = flow(api.clone());
        flow.start_sign_in().unwrap();
        assert!(flow.submit_email("  nobody ").await.unwrap_err().is_validation());
        assert_eq!(flow.state(), AuthState::EmailForm);
        assert_eq!(api.calls("send_otp"), 0);
    }

    #[tokio::test]
    async fn test_rejected_code_keeps_otp_form() {
        let api = MockApi::new();
        *api.token.lock().unwrap() = Ok(Default::default());
        let (mut flow, tokens, _) = flow(api.clone());
        flow.start_sign_in().unwrap();
        flow.submit_email("user@example.com").await.unwrap();

        let err = flow.submit_otp("000000").await.unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Invalid verification code");
        assert_eq!(flow.state(), AuthState::OtpForm);
        assert!(tokens.token().is_none());

        assert_eq!(flow.back_to_email().unwrap(), AuthState::EmailForm);
    }

    #[tokio::test]
    async fn test_logout_from_listing_clears_token() {
        let (mut flow, tokens, _) = flow(MockApi::new());
        flow.start_sign_in().unwrap();
        flow.submit_email("user@example.com").await.unwrap();
        flow.submit_otp("123456").await.unwrap();
        flow.open_listing().unwrap();

        assert_eq!(flow.logout().unwrap(), AuthState::Unauth);
        assert!(tokens.token().is_none());
        assert!(flow.logout().is_err());
    }

    #[tokio::test]
    async fn test_restore_revalidates_token() {
        let api = MockApi::new();
        let (mut flow, tokens, _) = flow(api.clone());
        assert_eq!(flow.restore().await, AuthState::Unauth);
        assert_eq!(api.calls("current_user"), 0);

        tokens.set_token("stale");
        *api.user.lock().unwrap() = Err(MtchatError::SessionExpired);
        assert_eq!(flow.restore().await, AuthState::Unauth);
        assert!(tokens.token().is_none());

        tokens.set_token("fresh");
        *api.user.lock().unwrap() = Ok(CurrentUser {
            id: "u9".into(),
            ..Default::default()
        });
        assert_eq!(flow.restore().await, AuthState::Authenticated);
        assert_eq!(flow.user().map(|u| u.id.as_str()), Some("u9"));
    }

    #[tokio::test]
    async fn test_session_expiry_resets_from_creating() {
        let (mut flow, tokens, _) = flow(MockApi::new());
        flow.start_sign_in().unwrap();
        flow.submit_email("user@example.com").await.unwrap();
        flow.submit_otp("123456").await.unwrap();
        flow.open_creating().unwrap();

        assert_eq!(flow.handle_session_expired(), AuthState::Unauth);
        assert!(tokens.token().is_none());
    }
}
