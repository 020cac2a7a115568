//! Unified error handling with Sentry integration.
//!
//! Every storefront operation returns `Result<T, StorefrontError>`. Before an
//! error reaches the shopper it is turned into a [`Notice`] that never
//! exposes internals; unexpected failures are captured to Sentry first.

use greencart_core::EmailError;
use thiserror::Error;

use crate::api::ApiError;
use crate::state::StateError;
use crate::storage::StorageError;
use crate::views::Notice;

/// Shown for anything the shopper cannot fix themselves.
const GENERIC_FAILURE: &str = "Something went wrong. Please try again later.";

/// Facade-level error type.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Remote API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Local persistence failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cart or wishlist operation rejected.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Email rejected before contacting the server.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Auth succeeded but the response did not identify a user.
    #[error("Login response did not include a user id")]
    IncompleteLogin,

    /// The server refused the credentials or the new account.
    #[error("Rejected: {0}")]
    Rejected(ApiError),
}

impl StorefrontError {
    /// Classify a failed login or signup call.
    ///
    /// A 4xx from the auth endpoints means bad input, not an expired session.
    #[must_use]
    pub fn from_auth(err: ApiError) -> Self {
        match err {
            ApiError::Http { status, .. } if status < 500 => Self::Rejected(err),
            other => Self::Api(other),
        }
    }
}

impl StorefrontError {
    /// Whether this is a bug or outage rather than something the shopper did.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        match self {
            Self::Api(err) => err.is_unexpected(),
            Self::Storage(_) | Self::State(StateError::Storage(_)) | Self::IncompleteLogin => true,
            Self::State(_) | Self::InvalidEmail(_) | Self::Rejected(_) => false,
        }
    }

    /// Whether the operation needs a signed-in user.
    #[must_use]
    pub const fn is_auth_required(&self) -> bool {
        matches!(
            self,
            Self::State(StateError::AuthRequired)
                | Self::Api(ApiError::Http {
                    status: 401 | 403,
                    ..
                })
        )
    }

    /// The message to show the shopper.
    #[must_use]
    pub fn notice(&self) -> Notice {
        let message = match self {
            Self::Api(ApiError::Http {
                status: 401 | 403, ..
            }) => "Your session has expired. Please login again.".to_string(),
            Self::Api(err @ ApiError::Http { status, .. }) if *status < 500 => err.to_string(),
            Self::Rejected(err) => err.to_string(),
            Self::Api(_) | Self::IncompleteLogin => GENERIC_FAILURE.to_string(),
            Self::Storage(_) | Self::State(StateError::Storage(_)) => {
                "Could not save your changes on this device".to_string()
            }
            Self::State(StateError::AuthRequired) => "Please login to continue".to_string(),
            Self::State(StateError::InvalidQuantity(_)) => {
                "Quantity must be at least 1".to_string()
            }
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
        };
        Notice::error(message)
    }

    /// Capture unexpected errors to Sentry and log them.
    ///
    /// Without an initialised Sentry client the capture is a no-op.
    pub fn report(&self) {
        if self.is_unexpected() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::debug!(error = %self, "Storefront operation rejected");
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context.
///
/// Call this after sign-in to associate errors with the user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a shopper action.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::views::NoticeLevel;

    fn http(status: u16, body: &str) -> StorefrontError {
        StorefrontError::Api(ApiError::Http {
            status,
            body: body.to_string(),
        })
    }

    #[test]
    fn test_client_errors_show_server_text() {
        let notice = http(400, "Email already registered").notice();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Email already registered");
        assert!(!http(400, "x").is_unexpected());
    }

    #[test]
    fn test_server_errors_are_hidden() {
        let err = http(500, "NullPointerException at CartService.java:42");
        assert_eq!(err.notice().message, GENERIC_FAILURE);
        assert!(err.is_unexpected());
    }

    #[test]
    fn test_auth_errors() {
        let expired = http(401, "");
        assert!(expired.is_auth_required());
        assert!(expired.notice().message.contains("session has expired"));

        let rejected = StorefrontError::from_auth(ApiError::Http {
            status: 401,
            body: "Invalid credentials".to_string(),
        });
        assert!(!rejected.is_auth_required());
        assert!(!rejected.is_unexpected());
        assert_eq!(rejected.notice().message, "Invalid credentials");
        let outage = StorefrontError::from_auth(ApiError::Http {
            status: 502,
            body: String::new(),
        });
        assert!(outage.is_unexpected());

        let missing = StorefrontError::from(StateError::AuthRequired);
        assert!(missing.is_auth_required());
        assert!(!missing.is_unexpected());
    }

    #[test]
    fn test_storage_errors_are_unexpected() {
        let storage = StorageError::Io {
            path: PathBuf::from("/tmp/cart.json"),
            source: std::io::Error::other("disk full"),
        };
        let err = StorefrontError::from(StateError::Storage(storage));
        assert!(err.is_unexpected());
        assert!(!err.notice().message.contains("disk full"));
    }

    #[test]
    fn test_invalid_email_notice() {
        let err = StorefrontError::from(EmailError::Empty);
        assert_eq!(err.notice().message, "Please enter a valid email address");
        assert!(!err.is_unexpected());
    }

    #[test]
    fn test_report_without_sentry_is_noop() {
        http(503, "").report();
        StorefrontError::IncompleteLogin.report();
    }
}
