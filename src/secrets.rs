//! Exchange credential handling
//!
//! API key and secret are read once at startup and held in `Zeroizing`
//! buffers, so they are wiped from memory when dropped. Only a masked form of
//! the key is ever logged.

use std::env;
use std::fmt;
use tracing::info;
use zeroize::Zeroizing;

pub const API_KEY_VAR: &str = "API_KEY";
pub const API_SECRET_VAR: &str = "API_SECRET";

/// Error type for secret loading operations
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SecretError {
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("Secret validation failed: {0}")]
    ValidationFailed(String),
}

/// API key/secret pair for the exchange
#[derive(Clone)]
pub struct Credentials {
    api_key: Zeroizing<String>,
    api_secret: Zeroizing<String>,
}

impl Credentials {
    /// Build credentials, rejecting blank values
    pub fn new(api_key: &str, api_secret: &str) -> Result<Self, SecretError> {
        let api_key = require_non_blank(API_KEY_VAR, api_key)?;
        let api_secret = require_non_blank(API_SECRET_VAR, api_secret)?;
        Ok(Self {
            api_key,
            api_secret,
        })
    }

    /// Load from `API_KEY` / `API_SECRET`
    pub fn from_env() -> Result<Self, SecretError> {
        Self::from_env_vars(API_KEY_VAR, API_SECRET_VAR)
    }

    /// Load from arbitrary variable names
    pub fn from_env_vars(key_var: &str, secret_var: &str) -> Result<Self, SecretError> {
        let api_key = load_from_env(key_var)?;
        let api_secret = load_from_env(secret_var)?;
        let credentials = Self::new(&api_key, &api_secret)?;
        info!("✓ Loaded exchange credentials (key {})", credentials.masked_key());
        Ok(credentials)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    /// First and last four characters of the key; shorter keys are fully masked
    pub fn masked_key(&self) -> String {
        mask(&self.api_key)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.masked_key())
            .field("api_secret", &"****")
            .finish()
    }
}

fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn require_non_blank(name: &str, value: &str) -> Result<Zeroizing<String>, SecretError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SecretError::ValidationFailed(format!("{} is blank", name)));
    }
    Ok(Zeroizing::new(trimmed.to_string()))
}

/// Load a secret from environment variable (wrapped in Zeroizing)
fn load_from_env(env_var_name: &str) -> Result<Zeroizing<String>, SecretError> {
    env::var(env_var_name)
        .map(Zeroizing::new)
        .map_err(|_| SecretError::EnvVarNotSet(env_var_name.to_string()))
}
