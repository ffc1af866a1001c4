use crate::gmail::models::{ListMessagesResponse, Message};
use crate::google::api::GoogleApi;
use crate::google::error::GoogleError;
use async_trait::async_trait;

const USER: &str = "me";

/// Read-only view of a mailbox. Implemented over HTTP by [`GmailClient`],
/// and by fakes in tests.
#[async_trait]
pub trait GmailApi: Send + Sync {
    /// Ids (and thread ids) of messages matching a Gmail search query.
    async fn search_messages(&self, query: &str, max_results: u32) -> Result<Vec<Message>, GoogleError>;

    /// Full message including headers and body parts.
    async fn get_message(&self, id: &str) -> Result<Message, GoogleError>;
}

#[derive(Clone, Debug)]
pub struct GmailClient {
    api: GoogleApi,
}

impl GmailClient {
    pub fn new(api: GoogleApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl GmailApi for GmailClient {
    async fn search_messages(&self, query: &str, max_results: u32) -> Result<Vec<Message>, GoogleError> {
        let mut url = self.api.url(&["gmail", "v1", "users", USER, "messages"])?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("maxResults", &max_results.to_string());

        let response: ListMessagesResponse = self.api.get(url).await?;
        tracing::debug!(
            count = response.messages.len(),
            estimate = response.result_size_estimate,
            more = response.next_page_token.is_some(),
            "searched messages"
        );

        Ok(response.messages)
    }

    async fn get_message(&self, id: &str) -> Result<Message, GoogleError> {
        let mut url = self.api.url(&["gmail", "v1", "users", USER, "messages", id])?;
        url.query_pairs_mut().append_pair("format", "full");

        self.api.get(url).await
    }
}
