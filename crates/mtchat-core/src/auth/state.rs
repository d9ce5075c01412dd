//! Sign-in flow state machine.
//!
//! The flow is driven by an explicit adjacency table. Every move goes through
//! [`AuthFsm::transition`] or [`AuthFsm::apply`], which reject moves the table
//! does not list and leave the current state untouched.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{MtchatError, Result};

/// Current step of the conversational sign-in / catalog flow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum AuthState {
    /// No session claimed.
    #[default]
    Unauth,
    /// Waiting for the user's email address.
    EmailForm,
    /// OTP sent; waiting for the six-digit code.
    OtpForm,
    /// Token held and verified.
    Authenticated,
    /// Browsing the user's own entities.
    Listing,
    /// Filling in the creation form.
    Creating,
}

impl AuthState {
    /// States reachable from `self` in one step.
    pub fn successors(self) -> &'static [AuthState] {
        use AuthState::*;
        match self {
            Unauth => &[EmailForm],
            EmailForm => &[OtpForm],
            OtpForm => &[Authenticated, EmailForm],
            Authenticated => &[Listing, Creating, Unauth],
            Listing => &[Authenticated],
            Creating => &[Authenticated],
        }
    }

    /// Returns true if `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: AuthState) -> bool {
        self.successors().contains(&next)
    }

    /// Returns true when the state implies a held session token.
    pub fn is_signed_in(self) -> bool {
        matches!(
            self,
            AuthState::Authenticated | AuthState::Listing | AuthState::Creating
        )
    }

    /// Every state, in declaration order.
    pub fn all() -> impl Iterator<Item = AuthState> {
        AuthState::iter()
    }
}

/// Inputs that drive the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum AuthEvent {
    StartSignIn,
    OtpSent,
    OtpVerified,
    BackToEmail,
    OpenListing,
    OpenCreating,
    Done,
    Logout,
}

/// Total function `(state, event) -> next state`.
///
/// Returns `None` when the event has no meaning in `state`.
pub fn next_state(state: AuthState, event: AuthEvent) -> Option<AuthState> {
    use AuthEvent as E;
    use AuthState as S;
    match (state, event) {
        (S::Unauth, E::StartSignIn) => Some(S::EmailForm),
        (S::EmailForm, E::OtpSent) => Some(S::OtpForm),
        (S::OtpForm, E::OtpVerified) => Some(S::Authenticated),
        (S::OtpForm, E::BackToEmail) => Some(S::EmailForm),
        (S::Authenticated, E::OpenListing) => Some(S::Listing),
        (S::Authenticated, E::OpenCreating) => Some(S::Creating),
        (S::Authenticated, E::Logout) => Some(S::Unauth),
        (S::Listing | S::Creating, E::Done) => Some(S::Authenticated),
        _ => None,
    }
}

/// Holder of the single current [`AuthState`].
#[derive(Debug, Clone, Default)]
pub struct AuthFsm {
    state: AuthState,
}

impl AuthFsm {
    /// Creates a machine in the `unauth` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a machine positioned at `state`.
    pub fn with_state(state: AuthState) -> Self {
        Self { state }
    }

    /// Pure accessor for the current state.
    pub fn current_state(&self) -> AuthState {
        self.state
    }

    /// Moves to `next` if the adjacency table allows it.
    ///
    /// # Errors
    ///
    /// Returns `MtchatError::InvalidTransition` and keeps the current state
    /// when `next` is not a successor of the current state.
    pub fn transition(&mut self, next: AuthState) -> Result<AuthState> {
        if !self.state.can_transition_to(next) {
            return Err(MtchatError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(next)
    }

    /// Applies an event through [`next_state`].
    pub fn apply(&mut self, event: AuthEvent) -> Result<AuthState> {
        match next_state(self.state, event) {
            Some(next) => {
                self.state = next;
                Ok(next)
            }
            None => Err(MtchatError::InvalidTransition {
                from: self.state.to_string(),
                to: event.to_string(),
            }),
        }
    }

    /// Forces the machine back to `unauth`; used on session expiry and
    /// cancellation, which are legal from every state.
    pub fn reset(&mut self) -> AuthState {
        self.state = AuthState::Unauth;
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    #[test]
    fn test_default_is_unauth() {
        assert_eq!(AuthFsm::new().current_state(), AuthState::Unauth);
    }

    #[test]
    fn test_happy_path() {
        let mut fsm = AuthFsm::new();
        for next in [
            AuthState::EmailForm,
            AuthState::OtpForm,
            AuthState::Authenticated,
            AuthState::Listing,
            AuthState::Authenticated,
            AuthState::Creating,
            AuthState::Authenticated,
            AuthState::Unauth,
        ] {
            assert_eq!(fsm.transition(next).unwrap(), next);
        }
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut fsm = AuthFsm::new();
        let err = fsm.transition(AuthState::Listing).unwrap_err();
        assert_eq!(
            err,
            MtchatError::InvalidTransition {
                from: "unauth".into(),
                to: "listing".into()
            }
        );
        assert_eq!(fsm.current_state(), AuthState::Unauth);
    }

    #[test]
    fn test_back_to_email() {
        let mut fsm = AuthFsm::with_state(AuthState::OtpForm);
        assert_eq!(fsm.apply(AuthEvent::BackToEmail).unwrap(), AuthState::EmailForm);
    }

    #[test]
    fn test_reset_from_anywhere() {
        for state in AuthState::all() {
            let mut fsm = AuthFsm::with_state(state);
            assert_eq!(fsm.reset(), AuthState::Unauth);
        }
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(AuthState::EmailForm.to_string(), "emailForm");
        assert_eq!(AuthState::from_str("otpForm").unwrap(), AuthState::OtpForm);
        assert_eq!(
            serde_json::to_string(&AuthState::Authenticated).unwrap(),
            "\"authenticated\""
        );
    }

    #[test]
    fn test_events_agree_with_table() {
        let events = [
            AuthEvent::StartSignIn,
            AuthEvent::OtpSent,
            AuthEvent::OtpVerified,
            AuthEvent::BackToEmail,
            AuthEvent::OpenListing,
            AuthEvent::OpenCreating,
            AuthEvent::Done,
            AuthEvent::Logout,
        ];
        for state in AuthState::all() {
            for event in events {
                if let Some(next) = next_state(state, event) {
                    assert!(state.can_transition_to(next), "{state} -> {next}");
                }
            }
        }
    }

    fn any_state() -> impl Strategy<Value = AuthState> {
        prop::sample::select(AuthState::all().collect::<Vec<_>>())
    }

    proptest! {
        // Any sequence of requested moves leaves the machine in a state that
        // is reachable from unauth purely through table edges.
        #[test]
        fn prop_state_always_reachable(moves in prop::collection::vec(any_state(), 0..40)) {
            let mut fsm = AuthFsm::new();
            let mut trail = vec![fsm.current_state()];
            for next in moves {
                let before = fsm.current_state();
                match fsm.transition(next) {
                    Ok(s) => {
                        prop_assert!(before.can_transition_to(s));
                        trail.push(s);
                    }
                    Err(_) => prop_assert_eq!(fsm.current_state(), before),
                }
            }
            for pair in trail.windows(2) {
                prop_assert!(pair[0].can_transition_to(pair[1]));
            }
        }
    }
}
