use crate::google::error::GoogleError;
use axum::Router;
use axum::extract::{Query, State};
use axum::routing::get;
use serde::Deserialize;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const SUCCESS_MESSAGE: &str = "Authentication successful! You can check the terminal now.";
const FAILURE_MESSAGE: &str = "Authentication failed. No code found.";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

type CallbackResult = Result<String, String>;

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[derive(Clone)]
struct CallbackContext {
    expected_state: Arc<str>,
    results: mpsc::Sender<CallbackResult>,
}

/// One-shot listener receiving the OAuth redirect on localhost.
pub struct CallbackServer {
    addr: SocketAddr,
    results: mpsc::Receiver<CallbackResult>,
    shutdown: CancellationToken,
    server: JoinHandle<io::Result<()>>,
}

impl CallbackServer {
    /// Serve the redirect route on an already bound listener.
    pub fn start(listener: TcpListener, expected_state: impl Into<Arc<str>>) -> io::Result<Self> {
        let addr = listener.local_addr()?;
        let (sender, results) = mpsc::channel(1);

        let router = Router::new()
            .route("/", get(handle_redirect))
            .with_state(CallbackContext {
                expected_state: expected_state.into(),
                results: sender,
            });

        let shutdown = CancellationToken::new();
        let stop = shutdown.clone();
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await
        });

        Ok(Self {
            addr,
            results,
            shutdown,
            server,
        })
    }

    /// Redirect uri registered with the authorization request.
    pub fn redirect_uri(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait for the redirect, Ctrl-C, or the server going away, whichever
    /// comes first. The server is stopped afterwards.
    pub async fn wait(mut self) -> Result<String, GoogleError> {
        let outcome = tokio::select! {
            received = self.results.recv() => match received {
                Some(Ok(code)) => Ok(code),
                Some(Err(reason)) => Err(GoogleError::authorization(reason)),
                None => Err(GoogleError::authorization("callback server closed")),
            },
            served = &mut self.server => {
                let reason = match served {
                    Ok(Ok(())) => "callback server stopped".to_string(),
                    Ok(Err(err)) => format!("callback server error: {}", err),
                    Err(err) => format!("callback server task failed: {}", err),
                };
                return Err(GoogleError::authorization(reason));
            }
            _ = tokio::signal::ctrl_c() => Err(GoogleError::Cancelled),
        };

        self.shutdown.cancel();
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut self.server).await.is_err() {
            tracing::debug!("callback server still draining, detaching");
        }

        outcome
    }
}

async fn handle_redirect(
    State(context): State<CallbackContext>,
    Query(query): Query<CallbackQuery>,
) -> &'static str {
    let result = match query {
        CallbackQuery {
            code: Some(code),
            state: Some(state),
            ..
        } if !code.is_empty() && *state == *context.expected_state => Ok(code),
        CallbackQuery {
            error: Some(error), ..
        } => Err(format!("authorization server returned {}", error)),
        CallbackQuery { code: Some(_), .. } => Err("state mismatch in redirect".to_string()),
        _ => Err("no code found in redirect".to_string()),
    };

    let message = if result.is_ok() {
        SUCCESS_MESSAGE
    } else {
        FAILURE_MESSAGE
    };

    if context.results.try_send(result).is_err() {
        tracing::debug!("ignoring repeated oauth redirect");
    }

    message
}
