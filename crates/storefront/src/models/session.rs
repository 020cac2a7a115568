//! Session-related types.
//!
//! The auth service owns sessions; the client keeps an opaque copy of the
//! bearer token plus enough identity to address the server-side cart.

use chrono::{DateTime, Utc};
use greencart_core::{Email, UserId};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// The signed-in user.
///
/// `Debug` never prints the token: `SecretString` redacts itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(alias = "id")]
    pub user_id: UserId,
    #[serde(with = "secret_token")]
    pub token: SecretString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "Utc::now")]
    pub logged_in_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for a freshly authenticated user.
    #[must_use]
    pub fn new(user_id: UserId, token: SecretString) -> Self {
        Self {
            user_id,
            token,
            email: None,
            name: None,
            logged_in_at: Utc::now(),
        }
    }
}

/// Serde adapter that writes a `SecretString` as a plain JSON string.
///
/// Only used for the local session blob and outgoing credentials; everything
/// else keeps the value wrapped.
pub(crate) mod secret_token {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}
