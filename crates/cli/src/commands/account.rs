//! Sign-in and sign-up.
//!
//! Passwords come from `--password` or, when that is omitted, the first
//! line of stdin so they stay out of shell history:
//!
//! ```bash
//! pass show greencart | greencart login --email asha@example.com
//! ```

use std::io::BufRead;

use greencart_core::Email;
use greencart_storefront::StorefrontError;
use greencart_storefront::api::SignupRequest;
use greencart_storefront::views::{Notice, Renderer};
use secrecy::{ExposeSecret, SecretString};

use super::{CommandError, Shop};

fn read_password(
    flag: Option<String>,
    input: &mut impl BufRead,
) -> Result<SecretString, CommandError> {
    let raw = match flag {
        Some(password) => password,
        None => {
            let mut line = String::new();
            input.read_line(&mut line)?;
            line
        }
    };

    let password = SecretString::from(raw.trim_end_matches(['\r', '\n']).to_string());
    if password.expose_secret().is_empty() {
        return Err(CommandError::EmptyPassword);
    }
    Ok(password)
}

/// Read the password, telling the user when there is none.
fn prompt_password(shop: &mut Shop, flag: Option<String>) -> Result<SecretString, CommandError> {
    read_password(flag, &mut std::io::stdin().lock()).inspect_err(|e| {
        shop.renderer_mut().notify(&Notice::error(e.to_string()));
    })
}

/// `greencart login`
///
/// # Errors
///
/// Returns an error if no password was given or the login failed.
pub async fn login(
    shop: &mut Shop,
    email: &str,
    password: Option<String>,
) -> Result<(), CommandError> {
    let password = prompt_password(shop, password)?;
    shop.login(email, password).await?;
    Ok(())
}

/// `greencart signup`
///
/// # Errors
///
/// Returns an error for a malformed email, a missing password, or a failed
/// signup.
pub async fn signup(
    shop: &mut Shop,
    name: String,
    email: &str,
    phone: Option<String>,
    password: Option<String>,
) -> Result<(), CommandError> {
    let email = match Email::parse(email) {
        Ok(email) => email,
        Err(e) => {
            let err = StorefrontError::from(e);
            shop.renderer_mut().notify(&err.notice());
            return Err(err.into());
        }
    };
    let password = prompt_password(shop, password)?;

    let request = SignupRequest {
        name,
        email,
        password,
        phone,
    };
    shop.signup(&request).await?;
    Ok(())
}
