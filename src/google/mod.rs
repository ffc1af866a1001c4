//! Shared Google plumbing for the Gmail and Calendar servers.
//!
//! Covers the OAuth2 installed-app flow (cached token, silent refresh, browser
//! redirect to a localhost listener, manual code entry) and a small JSON
//! transport that keeps the access token fresh for the lifetime of a server.

pub mod api;
pub mod browser;
pub mod callback;
pub mod credentials;
pub mod error;
pub mod oauth;
pub mod token;

use crate::google::api::{GoogleApi, TokenSource};
use crate::google::credentials::Credentials;
use crate::google::error::GoogleError;
use crate::google::oauth::{OAuthConfig, SCOPES};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authorize against Google and return a transport ready for api calls.
///
/// May block on the interactive browser flow when no usable token is cached.
pub async fn connect(credentials_file: &Path, token_file: &Path) -> Result<GoogleApi, GoogleError> {
    let credentials = Credentials::from_file(credentials_file).await?;
    let config = OAuthConfig::new(credentials, SCOPES);
    let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

    let token = oauth::authorize(&config, &http, token_file).await?;
    let tokens = TokenSource::new(config, http.clone(), token_file.to_path_buf(), token);

    GoogleApi::new(http, Arc::new(tokens))
}
