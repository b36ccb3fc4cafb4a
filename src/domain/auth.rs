//! Identity provider boundary.

use crate::error::TokenError;
use async_trait::async_trait;

/// Source of the access token written to the device as the final field.
///
/// A token is requested immediately before each submission and never cached
/// by this crate.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, TokenError>;
}

/// Provider backed by a pre-issued token, used by the CLI and in tests.
pub struct FixedTokenProvider {
    token: String,
}

impl FixedTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for FixedTokenProvider {
    async fn bearer_token(&self) -> Result<String, TokenError> {
        Ok(self.token.clone())
    }
}
