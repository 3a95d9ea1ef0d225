//! Services holding the authentication rules
//!
//! Each service owns `Arc` handles to the repositories it needs and is
//! generic over their implementations.

pub mod identity;
pub mod password_reset;
pub mod passwordless;
pub mod token;

pub use identity::{IdentityService, SignupRequest};
pub use password_reset::PasswordResetService;
pub use passwordless::PasswordlessService;
pub use token::TokenService;
