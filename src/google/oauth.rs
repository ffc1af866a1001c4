//! Authorization code flow against Google's OAuth2 endpoints.
//!
//! [`authorize`] decides between reusing the cached token, refreshing it
//! silently, or sending the user through the browser again. The browser
//! flow listens on an ephemeral localhost port for the redirect and falls
//! back to pasting the code by hand when no port can be bound.

use crate::google::browser;
use crate::google::callback::CallbackServer;
use crate::google::credentials::Credentials;
use crate::google::error::GoogleError;
use crate::google::token::{Token, TokenResponse};
use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::path::Path;
use tokio::io::AsyncBufReadExt;
use tokio::net::TcpListener;
use url::Url;

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Scopes requested by every server, so Gmail and Calendar can share one token file.
pub const SCOPES: &[&str] = &[CALENDAR_SCOPE, GMAIL_READONLY_SCOPE];

/// Redirect used when the code is copied by hand.
const OUT_OF_BAND_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";
const STATE_LENGTH: usize = 32;

#[derive(Clone, Debug)]
pub struct OAuthConfig {
    credentials: Credentials,
    scopes: Vec<String>,
}

impl OAuthConfig {
    pub fn new(credentials: Credentials, scopes: &[&str]) -> Self {
        Self {
            credentials,
            scopes: scopes.iter().map(|scope| scope.to_string()).collect(),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Consent page url asking for offline access.
    pub fn auth_code_url(&self, redirect_uri: &str, state: &str) -> Result<Url, GoogleError> {
        let mut url = Url::parse(&self.credentials.auth_uri)?;
        url.query_pairs_mut()
            .append_pair("access_type", "offline")
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state);

        Ok(url)
    }

    pub async fn exchange(
        &self,
        http: &reqwest::Client,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Token, GoogleError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code.trim()),
            ("redirect_uri", redirect_uri),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];

        self.token_request(http, &form).await
    }

    /// Trade the refresh token for a new access token. The refresh token is
    /// carried over when the endpoint does not rotate it.
    pub async fn refresh(&self, http: &reqwest::Client, token: &Token) -> Result<Token, GoogleError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .filter(|refresh_token| !refresh_token.is_empty())
            .ok_or_else(|| GoogleError::authorization("token expired and has no refresh token"))?;

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];

        let mut refreshed = self.token_request(http, &form).await?;
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = token.refresh_token.clone();
        }

        Ok(refreshed)
    }

    async fn token_request(
        &self,
        http: &reqwest::Client,
        form: &[(&str, &str)],
    ) -> Result<Token, GoogleError> {
        let response = http
            .post(&self.credentials.token_uri)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GoogleError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(GoogleError::Decode)?;
        if token.access_token.is_empty() {
            return Err(GoogleError::authorization("token response without access_token"));
        }

        Ok(token.into_token(Utc::now()))
    }
}

/// Produce a usable token for `token_path`, persisting whatever changed.
pub async fn authorize(
    config: &OAuthConfig,
    http: &reqwest::Client,
    token_path: &Path,
) -> Result<Token, GoogleError> {
    let cached = match Token::load(token_path).await {
        Ok(token) => token,
        Err(err) => {
            tracing::info!(%err, "no usable cached token, starting authorization");
            return authorize_and_save(config, http, token_path).await;
        }
    };

    match next_step(&cached) {
        CachedStep::Use => return Ok(cached),
        CachedStep::Reauthorize => {
            tracing::info!("cached token expired and has no refresh token, starting authorization");
            return authorize_and_save(config, http, token_path).await;
        }
        CachedStep::Refresh => {}
    }

    match config.refresh(http, &cached).await {
        Ok(refreshed) => {
            if refreshed.access_token != cached.access_token {
                refreshed.save(token_path).await?;
            }
            Ok(refreshed)
        }
        Err(err) => {
            tracing::warn!(%err, "unable to refresh token");
            authorize_and_save(config, http, token_path).await
        }
    }
}

/// What [`authorize`] does with a token read from the cache.
#[derive(Debug, PartialEq, Eq)]
enum CachedStep {
    Use,
    Refresh,
    Reauthorize,
}

fn next_step(cached: &Token) -> CachedStep {
    if cached.is_valid() {
        CachedStep::Use
    } else if cached.refresh_token.as_deref().is_some_and(|token| !token.is_empty()) {
        CachedStep::Refresh
    } else {
        CachedStep::Reauthorize
    }
}

async fn authorize_and_save(
    config: &OAuthConfig,
    http: &reqwest::Client,
    token_path: &Path,
) -> Result<Token, GoogleError> {
    let token = token_from_web(config, http).await?;
    token.save(token_path).await?;
    Ok(token)
}

/// Browser flow with a localhost redirect, manual entry as a fallback.
pub async fn token_from_web(config: &OAuthConfig, http: &reqwest::Client) -> Result<Token, GoogleError> {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::warn!(%err, "unable to create redirect listener");
            return token_from_manual_entry(config, http).await;
        }
    };

    let state = random_state();
    let callback = CallbackServer::start(listener, state.as_str())?;
    let redirect_uri = callback.redirect_uri();
    let auth_url = config.auth_code_url(&redirect_uri, &state)?;

    eprintln!("Opening browser to visit: \n{}", auth_url);
    if let Err(err) = browser::open(auth_url.as_str()) {
        eprintln!("Unable to open browser: {}", err);
        eprintln!("Please open the link manually.");
    }

    let code = callback.wait().await?;
    config.exchange(http, &code, &redirect_uri).await
}

async fn token_from_manual_entry(
    config: &OAuthConfig,
    http: &reqwest::Client,
) -> Result<Token, GoogleError> {
    let auth_url = config.auth_code_url(OUT_OF_BAND_REDIRECT, &random_state())?;

    eprintln!(
        "Go to the following link in your browser then type the authorization code: \n{}",
        auth_url
    );

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let code = lines
        .next_line()
        .await?
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .ok_or_else(|| GoogleError::authorization("no authorization code entered"))?;

    config.exchange(http, &code, OUT_OF_BAND_REDIRECT).await
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}
