//! Credential and token primitives.
//!
//! Passwords are hashed with Argon2id. Tokens are HMAC-SHA256 signed (HS256)
//! and bind an identifier to a purpose tag, optionally with a creation
//! timestamp for short-lived uses such as CSRF and password reset.
mod password;
mod token;

pub use password::{AuthError, hash_password, verify_password};
pub use token::{TokenError, TokenSigner};

/// Purpose tag for email verification links.
pub const KIND_VERIFY_EMAIL: &str = "verify-email";

/// Purpose tag for password reset links.
pub const KIND_RESET_PASSWORD: &str = "reset-password";

/// Purpose tag for CSRF form tokens.
pub const KIND_CSRF: &str = "csrf";
