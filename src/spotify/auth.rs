use reqwest::{Client, Url, header::AUTHORIZATION};
use tokio::sync::Mutex;

use crate::{
    config::{SPOTIFY_SCOPE, SpotifyConfig},
    error::{Error, Result},
    info,
    management::TokenStore,
    types::{AuthTokens, TokenResponse},
    utils, warning,
};

/// Hands out valid access tokens, refreshing them against the token endpoint
/// when they have expired or were rejected.
///
/// Refreshes are serialized so that two callers noticing an expired token at
/// the same moment do not both burn the refresh token.
///
/// Tokens obtained by this instance are kept in memory as well as written to
/// the [`TokenStore`]. Once a refresh or code exchange has happened the
/// in-memory copy wins, so a failed file write does not lose a rotated
/// refresh token.
pub struct Authenticator {
    config: SpotifyConfig,
    store: TokenStore,
    http: Client,
    refresh_lock: Mutex<()>,
    current: Mutex<Option<AuthTokens>>,
}

impl Authenticator {
    pub fn new(config: SpotifyConfig, store: TokenStore) -> Self {
        Self::with_client(config, store, Client::new())
    }

    pub fn with_client(config: SpotifyConfig, store: TokenStore, http: Client) -> Self {
        Self {
            config,
            store,
            http,
            refresh_lock: Mutex::new(()),
            current: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Builds the provider's authorization URL the user is sent to.
    ///
    /// # Example
    ///
    /// ```
    /// let url = authenticator.authorize_url()?;
    /// // https://accounts.spotify.com/authorize?client_id=...&response_type=code&...
    /// ```
    pub fn authorize_url(&self) -> Result<String> {
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", SPOTIFY_SCOPE),
            ],
        )
        .map_err(|e| Error::Config(format!("invalid authorization URL: {e}")))?;
        Ok(url.to_string())
    }

    /// Returns an access token that has not expired yet.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthenticated`] if no tokens are stored
    /// - [`Error::RefreshFailed`] if the token expired and could not be renewed
    pub async fn access_token(&self) -> Result<String> {
        let tokens = match self.tokens().await? {
            Some(tokens) if !tokens.access_token.is_empty() => tokens,
            _ => return Err(Error::Unauthenticated),
        };

        if self.store.is_expired(&tokens) {
            info!("Access token expired. Refreshing...");
            return self.refresh().await;
        }

        Ok(tokens.access_token)
    }

    /// Exchanges the stored refresh token for a new access token and stores
    /// the result.
    pub async fn refresh(&self) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        let previous = self.tokens().await?;
        let refresh_token = previous
            .as_ref()
            .and_then(|tokens| tokens.refresh_token.clone())
            .ok_or(Error::Unauthenticated)?;

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::RefreshFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RefreshFailed(format!("{status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::RefreshFailed(e.to_string()))?;

        let tokens = self.store.issue(&token, previous.as_ref());
        if let Err(e) = self.store.write(&tokens).await {
            warning!("Refreshed token could not be saved, keeping it in memory: {}", e);
        }
        let access_token = tokens.access_token.clone();
        self.remember(tokens).await;

        info!("Access token refreshed successfully");
        Ok(access_token)
    }

    /// Completes the authorization-code flow and stores the obtained tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<AuthTokens> {
        let response = self
            .http
            .post(&self.config.token_url)
            .header(
                AUTHORIZATION,
                utils::basic_credentials(&self.config.client_id, &self.config.client_secret),
            )
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http(status));
        }

        let token: TokenResponse = response.json().await?;
        let tokens = self.store.save(&token).await?;
        self.remember(tokens.clone()).await;
        info!("Tokens saved successfully");
        Ok(tokens)
    }

    /// The in-memory tokens if this instance obtained any, else the file.
    async fn tokens(&self) -> Result<Option<AuthTokens>> {
        if let Some(tokens) = self.current.lock().await.clone() {
            return Ok(Some(tokens));
        }
        self.store.load().await
    }

    async fn remember(&self, tokens: AuthTokens) {
        *self.current.lock().await = Some(tokens);
    }
}
