use crate::config::ObsidianConfig;
use crate::obsidian::active_file::ActiveFileService;
use crate::obsidian::commands::CommandService;
use crate::obsidian::error::ObsidianError;
use crate::obsidian::models::ErrorResponse;
use crate::obsidian::open::OpenService;
use crate::obsidian::periodic::PeriodicService;
use crate::obsidian::search::SearchService;
use crate::obsidian::vault::VaultService;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How the client verifies the plugin's TLS certificate.
#[derive(Clone, Debug)]
pub enum TlsMode {
    /// Trust the PEM certificate at this path
    Certificate(PathBuf),

    /// Skip verification, the plugin ships a self-signed certificate
    Insecure,
}

/// Client for the Obsidian Local REST API.
#[derive(Clone, Debug)]
pub struct ObsidianClient {
    base_url: Url,
    api_key: String,
    http: reqwest::Client,
}

impl ObsidianClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, tls: TlsMode) -> Result<Self, ObsidianError> {
        let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);

        builder = match tls {
            TlsMode::Certificate(path) => {
                let pem = std::fs::read(&path)
                    .map_err(|err| ObsidianError::certificate_io(&path, err))?;
                let certificate = reqwest::Certificate::from_pem(&pem)
                    .map_err(|err| ObsidianError::certificate(&path, err))?;
                builder.add_root_certificate(certificate)
            }
            TlsMode::Insecure => builder.danger_accept_invalid_certs(true),
        };

        let http = builder.build()?;

        Self::with_http_client(base_url, api_key, http)
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_http_client(
        base_url: &str,
        api_key: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self, ObsidianError> {
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };

        let base_url = Url::parse(&base_url).map_err(|err| ObsidianError::invalid_url(&base_url, err))?;
        if base_url.cannot_be_a_base() {
            return Err(ObsidianError::invalid_url(base_url.as_str(), "cannot be a base url"));
        }

        Ok(Self {
            base_url,
            api_key: api_key.into(),
            http,
        })
    }

    pub fn from_config(config: &ObsidianConfig) -> Result<Self, ObsidianError> {
        let tls = if config.cert.is_empty() {
            TlsMode::Insecure
        } else {
            TlsMode::Certificate(PathBuf::from(&config.cert))
        };

        Self::new(&config.url, config.api_key.clone(), tls)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn active_file(&self) -> ActiveFileService<'_> {
        ActiveFileService::new(self)
    }

    pub fn vault(&self) -> VaultService<'_> {
        VaultService::new(self)
    }

    pub fn periodic(&self) -> PeriodicService<'_> {
        PeriodicService::new(self)
    }

    pub fn search(&self) -> SearchService<'_> {
        SearchService::new(self)
    }

    pub fn commands(&self) -> CommandService<'_> {
        CommandService::new(self)
    }

    pub fn open(&self) -> OpenService<'_> {
        OpenService::new(self)
    }

    /// Resolve a `/` separated path below the base url. Every segment is
    /// percent-encoded on its own, a trailing `/` is preserved.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ObsidianError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ObsidianError::invalid_url(self.base_url.as_str(), "cannot be a base url"))?
            .pop_if_empty()
            .extend(path.split('/'));

        Ok(url)
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(%method, %url, "obsidian request");
        self.http.request(method, url).bearer_auth(&self.api_key)
    }

    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<(), ObsidianError> {
        Self::check(request.send().await?).await?;
        Ok(())
    }

    pub(crate) async fn send_text(&self, request: RequestBuilder) -> Result<String, ObsidianError> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.text().await?)
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ObsidianError> {
        let body = self.send_text(request).await?;
        serde_json::from_str(&body).map_err(ObsidianError::Decode)
    }

    async fn check(response: Response) -> Result<Response, ObsidianError> {
        let status = response.status();
        if !(status.is_client_error() || status.is_server_error()) {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(ErrorResponse { error_code, message }) => Err(ObsidianError::Api {
                code: error_code,
                message,
            }),
            Err(_) => Err(ObsidianError::Status {
                status: status.as_u16(),
                body,
            }),
        }
    }
}
