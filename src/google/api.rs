use crate::google::error::GoogleError;
use crate::google::oauth::OAuthConfig;
use crate::google::token::Token;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

pub const GOOGLE_API_BASE: &str = "https://www.googleapis.com/";

/// Hands out access tokens, refreshing and persisting them once they expire.
#[derive(Debug)]
pub struct TokenSource {
    config: OAuthConfig,
    http: reqwest::Client,
    token_path: PathBuf,
    token: Mutex<Token>,
}

impl TokenSource {
    pub fn new(config: OAuthConfig, http: reqwest::Client, token_path: PathBuf, token: Token) -> Self {
        Self {
            config,
            http,
            token_path,
            token: Mutex::new(token),
        }
    }

    pub async fn access_token(&self) -> Result<String, GoogleError> {
        let mut token = self.token.lock().await;

        if !token.is_valid() {
            tracing::debug!("access token expired, refreshing");
            let refreshed = self.config.refresh(&self.http, &token).await?;
            if let Err(err) = refreshed.save(&self.token_path).await {
                tracing::warn!(%err, "unable to persist refreshed token");
            }
            *token = refreshed;
        }

        Ok(token.access_token.clone())
    }
}

#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Authorized JSON transport for the Google REST apis.
#[derive(Clone, Debug)]
pub struct GoogleApi {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
    base_url: Url,
}

impl GoogleApi {
    pub fn new(http: reqwest::Client, tokens: Arc<TokenSource>) -> Result<Self, GoogleError> {
        Ok(Self {
            http,
            tokens,
            base_url: Url::parse(GOOGLE_API_BASE)?,
        })
    }

    /// Point the transport at another host, used against fake servers.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, GoogleError> {
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        self.base_url = Url::parse(&base_url)?;
        Ok(self)
    }

    /// Url made of percent-encoded path segments below the base url.
    pub fn url(&self, segments: &[&str]) -> Result<Url, GoogleError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, GoogleError> {
        let request = self.request(Method::GET, url).await?;
        self.send_json(request).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, GoogleError> {
        let mut request = self.request(Method::POST, url).await?;
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send_json(request).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, GoogleError> {
        let request = self.request(Method::PATCH, url).await?.json(body);
        self.send_json(request).await
    }

    pub async fn delete(&self, url: Url) -> Result<(), GoogleError> {
        let request = self.request(Method::DELETE, url).await?;
        self.send_text(request).await?;
        Ok(())
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, GoogleError> {
        let access_token = self.tokens.access_token().await?;
        tracing::debug!(%method, url = %url.path(), "google api request");
        Ok(self.http.request(method, url).bearer_auth(access_token))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GoogleError> {
        let body = self.send_text(request).await?;
        serde_json::from_str(&body).map_err(GoogleError::Decode)
    }

    async fn send_text(&self, request: RequestBuilder) -> Result<String, GoogleError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .ok()
            .filter(|message| !message.is_empty())
            .unwrap_or(body);

        Err(GoogleError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::google::oauth::tests::config_for;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Transport against `server` holding a token that never expires.
    pub(crate) fn api_for(server: &MockServer) -> GoogleApi {
        let token = Token {
            access_token: "test-token".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expiry: None,
        };
        let http = reqwest::Client::new();
        let tokens = TokenSource::new(
            config_for(&format!("{}/token", server.uri())),
            http.clone(),
            std::env::temp_dir().join("bttk-mcp-unused-token.json"),
            token,
        );

        GoogleApi::new(http, Arc::new(tokens))
            .unwrap()
            .with_base_url(&server.uri())
            .unwrap()
    }

    #[test]
    fn should_encode_path_segments() {
        let tokens = TokenSource::new(
            config_for("http://127.0.0.1:9/token"),
            reqwest::Client::new(),
            PathBuf::from("token.json"),
            Token::default(),
        );
        let api = GoogleApi::new(reqwest::Client::new(), Arc::new(tokens)).unwrap();

        let url = api
            .url(&["calendar", "v3", "calendars", "en.german#holiday@group.v.calendar.google.com", "events"])
            .unwrap();

        assert_eq!(
            "https://www.googleapis.com/calendar/v3/calendars/en.german%23holiday@group.v.calendar.google.com/events",
            url.as_str()
        );
    }

    #[tokio::test]
    async fn should_decode_google_error_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/nope"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}}"#,
            ))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let url = api.url(&["gmail", "v1", "users", "me", "messages", "nope"]).unwrap();
        let err = api.get::<serde_json::Value>(url).await.unwrap_err();

        assert_eq!("Requested entity was not found. (status 404)", err.to_string());
    }

    #[tokio::test]
    async fn should_refresh_expired_token_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"access_token": "refreshed", "token_type": "Bearer", "expires_in": 3599}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("authorization", "Bearer refreshed"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(2)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let token_path = dir.path().join("token.json");
        let expired = Token {
            access_token: "stale".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("refresh".to_string()),
            expiry: Some(Utc::now() - Duration::minutes(1)),
        };

        let http = reqwest::Client::new();
        let tokens = TokenSource::new(
            config_for(&format!("{}/token", server.uri())),
            http.clone(),
            token_path.clone(),
            expired,
        );
        let api = GoogleApi::new(http, Arc::new(tokens))
            .unwrap()
            .with_base_url(&server.uri())
            .unwrap();

        for _ in 0..2 {
            let url = api.url(&["ping"]).unwrap();
            api.get::<serde_json::Value>(url).await.unwrap();
        }

        let saved = Token::load(&token_path).await.unwrap();
        assert_eq!("refreshed", saved.access_token);
        assert_eq!(Some("refresh".to_string()), saved.refresh_token);
    }
}
