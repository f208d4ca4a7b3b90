//! The mock login session.
//!
//! There is no credential verification: any well-formed email and password
//! log the user in. The session is just an opaque token and a display name in
//! the key-value store. A real deployment would replace this module with a
//! networked authentication service.

use std::fmt::Display;

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;

use crate::{Error, ValidationError, key_value::KeyValueStore};

const TOKEN_KEY: &str = "userToken";
const NAME_KEY: &str = "userName";

/// The name shown for a user who has not registered a display name.
pub const DEFAULT_USER_NAME: &str = "Người dùng";

/// An opaque token that marks the user as logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// The token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn generate(email: &str) -> Self {
        let issued_at = OffsetDateTime::now_utc().unix_timestamp_nanos();
        let digest = Sha256::digest(format!("{email}:{issued_at}"));

        Self(format!("{digest:x}"))
    }
}

impl Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// An email and password that passed the form validation rules.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    /// The minimum number of characters in a password.
    pub const MIN_PASSWORD_LENGTH: usize = 6;

    /// Validate an email and password.
    ///
    /// # Errors
    /// Returns the first error of [Credentials::validate_email] and
    /// [Credentials::validate_password].
    pub fn new(email: &str, password: &str) -> Result<Self, ValidationError> {
        Self::validate_email(email)?;
        Self::validate_password(password)?;

        Ok(Self {
            email: email.to_owned(),
            password: password.to_owned(),
        })
    }

    /// The validated email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Check that `email` has the shape `local@domain.tld`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [ValidationError::EmptyEmail] if `email` is empty,
    /// - or [ValidationError::InvalidEmail] if it is not an email address.
    pub fn validate_email(email: &str) -> Result<(), ValidationError> {
        if email.is_empty() {
            return Err(ValidationError::EmptyEmail);
        }

        if has_email_shape(email) && EmailAddress::is_valid(email) {
            Ok(())
        } else {
            Err(ValidationError::InvalidEmail(email.to_owned()))
        }
    }

    /// Check that `password` has at least [Credentials::MIN_PASSWORD_LENGTH]
    /// characters.
    ///
    /// # Errors
    /// This function will return a:
    /// - [ValidationError::EmptyPassword] if `password` is empty,
    /// - or [ValidationError::PasswordTooShort] if it is too short.
    pub fn validate_password(password: &str) -> Result<(), ValidationError> {
        if password.is_empty() {
            return Err(ValidationError::EmptyPassword);
        }

        if password.graphemes(true).count() < Self::MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort);
        }

        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"********")
            .finish()
    }
}

/// One `@` with no whitespace, and a domain with a dot that has text on both
/// sides.
fn has_email_shape(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// The login state of the app's single user.
#[derive(Debug, Clone)]
pub struct Session<S> {
    store: S,
}

impl<S: KeyValueStore> Session<S> {
    /// Create a session backed by `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Whether a session token is stored.
    ///
    /// A storage failure is logged and treated as logged out.
    pub fn is_authenticated(&self) -> bool {
        match self.token() {
            Ok(token) => token.is_some(),
            Err(error) => {
                tracing::error!("Could not check the login status: {error}");
                false
            }
        }
    }

    /// The stored session token, if the user is logged in.
    ///
    /// # Errors
    /// Returns a [crate::StorageError] if the store fails.
    pub fn token(&self) -> Result<Option<SessionToken>, Error> {
        Ok(self.store.get(TOKEN_KEY)?.map(SessionToken))
    }

    /// Log in with an email and password.
    ///
    /// Any email and password that pass [Credentials::new] succeed.
    ///
    /// # Errors
    /// This function will return a:
    /// - [ValidationError] if the email or password is malformed,
    /// - or [crate::StorageError] if the token could not be stored.
    pub fn log_in(&self, email: &str, password: &str) -> Result<SessionToken, Error> {
        let credentials = Credentials::new(email, password).inspect_err(|error| {
            tracing::debug!("Rejected log in: {error}");
        })?;

        self.start(&credentials)
    }

    /// Register a new user and log them in.
    ///
    /// # Errors
    /// This function will return a:
    /// - [ValidationError::EmptyName] if `name` is empty,
    /// - [ValidationError] if the email or password is malformed,
    /// - [ValidationError::PasswordMismatch] if `confirm_password` differs from `password`,
    /// - or [crate::StorageError] if the profile could not be stored.
    pub fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<SessionToken, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }

        let credentials = Credentials::new(email, password)?;

        if password != confirm_password {
            return Err(ValidationError::PasswordMismatch.into());
        }

        self.store.set(NAME_KEY, name)?;

        self.start(&credentials).inspect_err(|_| {
            if let Err(error) = self.store.remove(NAME_KEY) {
                tracing::error!("Could not remove the name of a failed registration: {error}");
            }
        })
    }

    /// Log out, clearing the session token and the display name.
    ///
    /// # Errors
    /// Returns a [crate::StorageError] if the store fails.
    pub fn log_out(&self) -> Result<(), Error> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(NAME_KEY)?;

        tracing::info!("Logged out");

        Ok(())
    }

    /// The user's display name, or [DEFAULT_USER_NAME] if none is stored.
    ///
    /// # Errors
    /// Returns a [crate::StorageError] if the store fails.
    pub fn user_name(&self) -> Result<String, Error> {
        Ok(self
            .store
            .get(NAME_KEY)?
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_USER_NAME.to_owned()))
    }

    fn start(&self, credentials: &Credentials) -> Result<SessionToken, Error> {
        let token = SessionToken::generate(credentials.email());
        self.store.set(TOKEN_KEY, token.as_str())?;

        tracing::info!("Logged in as {}", credentials.email());

        Ok(token)
    }
}
