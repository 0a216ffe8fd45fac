//! Signed, client-held session state.
//!
//! The whole session lives in one cookie as an HS256-signed JSON payload.
//! The server keeps nothing; a cookie that fails verification is treated as
//! an empty session.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::auth::TokenError;
use crate::models::WorkId;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "pathfork-session";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    flashes: Vec<String>,
    #[serde(default)]
    work_id: i64,
    #[serde(default)]
    work_title: String,
}

/// Per-request view of the session.
///
/// Every mutation marks the session dirty; the response writer only emits a
/// `Set-Cookie` header for dirty sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    data: SessionData,
    dirty: bool,
}

impl Session {
    /// A fresh, anonymous session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_user(&mut self, email: &str) {
        self.data.user_email = Some(email.to_string());
        self.dirty = true;
    }

    /// The signed-in user's email, or `""` when anonymous.
    pub fn user_email(&self) -> &str {
        self.data.user_email.as_deref().unwrap_or("")
    }

    pub fn is_authenticated(&self) -> bool {
        !self.user_email().is_empty()
    }

    pub fn clear_user(&mut self) {
        self.data.user_email = None;
        self.dirty = true;
    }

    pub fn add_flash(&mut self, message: impl Into<String>) {
        self.data.flashes.push(message.into());
        self.dirty = true;
    }

    /// Removes and returns all pending flash messages.
    pub fn take_flashes(&mut self) -> Vec<String> {
        if self.data.flashes.is_empty() {
            return Vec::new();
        }
        self.dirty = true;
        std::mem::take(&mut self.data.flashes)
    }

    pub fn set_current_work(&mut self, id: WorkId, title: &str) {
        self.data.work_id = id.get();
        self.data.work_title = title.to_string();
        self.dirty = true;
    }

    /// The work the user last viewed; `(0, "")` when none.
    pub fn current_work(&self) -> (WorkId, &str) {
        (WorkId::new(self.data.work_id), &self.data.work_title)
    }

    pub fn unset_current_work(&mut self) {
        self.data.work_id = 0;
        self.data.work_title.clear();
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Seals sessions into cookie values and opens them again.
#[derive(Clone)]
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Reads the session out of a `Cookie` request header.
    ///
    /// Missing, tampered, or undecodable cookies yield an empty session.
    pub fn load(&self, cookie_header: Option<&str>) -> Session {
        let Some(value) = cookie_header.and_then(|header| cookie_value(header, SESSION_COOKIE))
        else {
            return Session::new();
        };

        match decode::<SessionData>(value, &self.decoding, &self.validation) {
            Ok(token) => Session {
                data: token.claims,
                dirty: false,
            },
            Err(e) => {
                tracing::warn!("Discarding unreadable session cookie: {}", e);
                Session::new()
            }
        }
    }

    /// Builds the `Set-Cookie` header value that persists `session`.
    pub fn set_cookie(&self, session: &Session) -> Result<String, TokenError> {
        let value = encode(&Header::new(Algorithm::HS256), &session.data, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(format!(
            "{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax"
        ))
    }
}

/// Finds one cookie's value in a `Cookie` header.
fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
