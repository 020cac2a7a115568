//! Request and response bodies for the auth and cart endpoints.

use greencart_core::{CartItemId, Email, ProductId, UserId};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::models::session::secret_token;
use crate::models::{Product, Session};

// =============================================================================
// Auth
// =============================================================================

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: Email,
    #[serde(with = "secret_token")]
    pub password: SecretString,
}

/// Body of `POST /auth/signup`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: Email,
    #[serde(with = "secret_token")]
    pub password: SecretString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// User record nested in some auth responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    #[serde(alias = "userId")]
    pub id: UserId,
    #[serde(default)]
    pub email: Option<Email>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response of `/auth/login` and `/auth/signup`.
///
/// The user id is read from the top level (`userId` or `id`) or from a
/// nested `user` object, whichever is present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(with = "secret_token")]
    pub token: SecretString,
    #[serde(default, alias = "id")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub email: Option<Email>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

impl AuthResponse {
    /// Build the local session, or `None` if the response names no user.
    #[must_use]
    pub fn into_session(self) -> Option<Session> {
        let (nested_id, nested_email, nested_name) = match self.user {
            Some(user) => (Some(user.id), user.email, user.name),
            None => (None, None, None),
        };

        let user_id = self.user_id.or(nested_id)?;
        let mut session = Session::new(user_id, self.token);
        session.email = self.email.or(nested_email);
        session.name = self.name.or(nested_name);
        Some(session)
    }
}

// =============================================================================
// Server-side cart
// =============================================================================

/// Body of `POST /cart/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// A line of the server-side cart.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartItem {
    pub id: CartItemId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub product: Option<Product>,
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
}

impl RemoteCartItem {
    /// Product id, from the flat field or the embedded product.
    #[must_use]
    pub fn resolved_product_id(&self) -> Option<ProductId> {
        self.product_id
            .or_else(|| self.product.as_ref().map(|product| product.id))
    }
}

/// `/products` listings come back either bare or wrapped in a page object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductListing {
    Page { content: Vec<Product> },
    List(Vec<Product>),
}

impl From<ProductListing> for Vec<Product> {
    fn from(listing: ProductListing) -> Self {
        match listing {
            ProductListing::Page { content } | ProductListing::List(content) => content,
        }
    }
}
