//! Obtaining the GroupMe access token.
//!
//! Lookup order:
//! 1. the token stored by a previous run
//! 2. an interactive prompt, when stdin is a terminal
//! 3. the `GREPME_API_KEY` environment variable
//!
//! A token obtained from 2 or 3 is stored for next time.

use std::io::IsTerminal;

use crate::CoreError;
use crate::groupme::storage::TokenStorage;

/// Environment variable consulted when stdin is not a terminal.
pub const API_KEY_ENV: &str = "GREPME_API_KEY";

const INSTRUCTIONS: &str = "\
To find your access token, go to https://dev.groupme.com/ and log in,
then click \"Access Token\" in the top right corner.";

/// Hands out the access token, prompting for it on first use.
#[derive(Debug)]
pub struct AuthManager {
    storage: TokenStorage,
}

impl AuthManager {
    /// Create a manager over the given storage.
    #[must_use]
    pub const fn new(storage: TokenStorage) -> Self {
        Self { storage }
    }

    /// Return the access token, obtaining and storing it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Auth`] if no token could be obtained, or an I/O
    /// error if the credentials file cannot be read or written.
    pub fn get_token(&self) -> Result<String, CoreError> {
        if let Some(token) = self.storage.load_token()? {
            log::debug!("using token from {}", self.storage.path().display());
            return Ok(token);
        }

        let entered = if std::io::stdin().is_terminal() {
            eprintln!("{INSTRUCTIONS}");
            dialoguer::Password::new()
                .with_prompt("Enter your GroupMe access token")
                .allow_empty_password(true)
                .interact()
                .map_err(|e| CoreError::Auth(format!("reading token: {e}")))?
        } else {
            log::warn!("stdin is not a terminal, reading token from {API_KEY_ENV}");
            std::env::var(API_KEY_ENV).unwrap_or_default()
        };

        let token = validate(&entered)?;
        self.storage.store_token(&token)?;
        Ok(token)
    }

    /// Forget the stored token so the next run asks again.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials file cannot be removed.
    pub fn clear_token(&self) -> Result<(), CoreError> {
        self.storage.clear_token()?;
        log::info!("deleted stored token at {}", self.storage.path().display());
        Ok(())
    }
}

fn validate(entered: &str) -> Result<String, CoreError> {
    let token = entered.trim();
    if token.is_empty() {
        return Err(CoreError::Auth("failed to read credentials".to_string()));
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_token_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = TokenStorage::new(dir.path().join("credentials.json"));
        storage.store_token("stored").expect("store");

        let auth = AuthManager::new(storage);
        assert_eq!(auth.get_token().expect("token"), "stored");
    }

    #[test]
    fn blank_input_is_rejected() {
        let err = validate("  \n").expect_err("blank");
        assert!(matches!(err, CoreError::Auth(ref msg) if msg == "failed to read credentials"));
        assert_eq!(validate(" abc \n").expect("token"), "abc");
    }
}
