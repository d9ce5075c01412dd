pub mod state;
pub mod validation;

pub use state::{AuthEvent, AuthFsm, AuthState, next_state};
pub use validation::{OTP_LENGTH, OtpCode, validate_email};
