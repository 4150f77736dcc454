use std::{path::PathBuf, sync::Arc};

use crate::{
    error::Result,
    types::{AuthTokens, TokenResponse},
    utils::Clock,
};

/// File-backed storage for the provider's OAuth tokens.
///
/// The JSON file is the only durable auth state. It is replaced by writing a
/// sibling temp file and renaming it over the original, so readers never see
/// a partially written file.
pub struct TokenStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    pub fn new(path: PathBuf, clock: Arc<dyn Clock>) -> Self {
        Self { path, clock }
    }

    /// Reads the stored tokens. A missing file means "not authenticated" and
    /// yields `Ok(None)`.
    pub async fn load(&self) -> Result<Option<AuthTokens>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let content = async_fs::read_to_string(&self.path).await?;
        let tokens: AuthTokens = serde_json::from_str(&content)?;
        Ok(Some(tokens))
    }

    /// Stores a token endpoint response and returns what was written.
    ///
    /// The provider does not always send a new refresh token, so the previously
    /// stored one is kept when the response has none.
    pub async fn save(&self, response: &TokenResponse) -> Result<AuthTokens> {
        let previous = self.load().await.ok().flatten();
        let tokens = self.issue(response, previous.as_ref());
        self.write(&tokens).await?;
        Ok(tokens)
    }

    /// Turns a token endpoint response into stored form without touching the
    /// file. `previous` supplies the refresh token when the response has none.
    pub fn issue(&self, response: &TokenResponse, previous: Option<&AuthTokens>) -> AuthTokens {
        let refresh_token = match &response.refresh_token {
            Some(token) if !token.is_empty() => Some(token.clone()),
            _ => previous.and_then(|tokens| tokens.refresh_token.clone()),
        };

        AuthTokens {
            access_token: response.access_token.clone(),
            refresh_token,
            expires_at: self.clock.now_millis() + (response.expires_in as i64) * 1000,
        }
    }

    pub fn is_expired(&self, tokens: &AuthTokens) -> bool {
        self.clock.now_millis() >= tokens.expires_at
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Replaces the token file with `tokens`.
    pub async fn write(&self, tokens: &AuthTokens) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                async_fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(tokens)?;
        let tmp = self.path.with_extension("json.tmp");
        async_fs::write(&tmp, json).await?;
        async_fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
