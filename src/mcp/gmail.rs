use crate::config::McpConfig;
use crate::gmail::{GmailApi, truncate_bodies};
use crate::mcp::{failure, instructions, json_result, retain_enabled_tools};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars, tool, tool_handler, tool_router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

pub const TOOL_PREFIX: &str = "gmail_";

const DEFAULT_MAX_RESULTS: u32 = 50;
const DEFAULT_MAX_BODY_BYTES: usize = 10_000;

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[schemars(description = "The search query (e.g., 'from:user@example.com', 'subject:meeting').")]
    pub query: String,
    #[serde(default, deserialize_with = "crate::mcp::whole_number")]
    #[schemars(description = "Maximum number of results to return (default 50).")]
    pub max_results: Option<u32>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    #[schemars(description = "The ID of the message to read.")]
    pub message_id: String,
    #[serde(default, deserialize_with = "crate::mcp::whole_number")]
    #[schemars(description = "Maximum bytes of body content to return (default 10000).")]
    pub max_body_bytes: Option<usize>,
}

#[derive(Clone)]
pub struct GmailMcp {
    tool_router: ToolRouter<GmailMcp>,
    gmail: Arc<dyn GmailApi>,
    instructions: String,
}

impl std::fmt::Debug for GmailMcp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailMcp")
            .field("instructions", &self.instructions)
            .finish_non_exhaustive()
    }
}

#[tool_router]
impl GmailMcp {
    pub fn new(gmail: Arc<dyn GmailApi>, config: &McpConfig) -> Self {
        let mut tool_router = Self::tool_router();
        retain_enabled_tools(&mut tool_router, config, TOOL_PREFIX);
        let instructions = instructions(
            "This server provides read-only access to a Gmail mailbox.",
            &tool_router,
        );

        Self {
            tool_router,
            gmail,
            instructions,
        }
    }

    #[tool(
        name = "gmail_search",
        description = "Search for Gmail messages using a query string.",
        annotations(read_only_hint = true)
    )]
    #[instrument(skip(self))]
    async fn search(
        &self,
        Parameters(SearchRequest { query, max_results }): Parameters<SearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        let max_results = max_results.unwrap_or(DEFAULT_MAX_RESULTS);

        match self.gmail.search_messages(&query, max_results).await {
            Ok(messages) => json_result(&json!({
                "count": messages.len(),
                "messages": messages,
            })),
            Err(err) => failure("search messages", err),
        }
    }

    #[tool(
        name = "gmail_read",
        description = "Read the content of a specific Gmail message by ID.",
        annotations(read_only_hint = true)
    )]
    #[instrument(skip(self))]
    async fn read(
        &self,
        Parameters(ReadRequest {
            message_id,
            max_body_bytes,
        }): Parameters<ReadRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut message = match self.gmail.get_message(&message_id).await {
            Ok(message) => message,
            Err(err) => return failure("get message", err),
        };

        if let Some(payload) = message.payload.as_mut() {
            truncate_bodies(payload, max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES));
        }

        json_result(&message)
    }
}

#[tool_handler]
impl ServerHandler for GmailMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(self.instructions.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::models::{Header, Message, MessagePart, MessagePartBody};
    use crate::google::error::GoogleError;
    use crate::mcp::tests::{is_error, json_of, read_only_tools, text_of};
    use async_trait::async_trait;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeGmail {
        searches: Mutex<Vec<(String, u32)>>,
    }

    #[async_trait]
    impl GmailApi for FakeGmail {
        async fn search_messages(&self, query: &str, max_results: u32) -> Result<Vec<Message>, GoogleError> {
            self.searches
                .lock()
                .unwrap()
                .push((query.to_string(), max_results));

            if query != "test" {
                return Ok(vec![]);
            }

            Ok(vec![
                Message {
                    id: "123".to_string(),
                    thread_id: "t123".to_string(),
                    ..Default::default()
                },
                Message {
                    id: "124".to_string(),
                    thread_id: "t124".to_string(),
                    ..Default::default()
                },
            ])
        }

        async fn get_message(&self, id: &str) -> Result<Message, GoogleError> {
            if id != "123" {
                return Err(GoogleError::Api {
                    status: 404,
                    message: "Requested entity was not found.".to_string(),
                });
            }

            Ok(Message {
                id: "123".to_string(),
                thread_id: "t123".to_string(),
                snippet: "Hello world".to_string(),
                payload: Some(MessagePart {
                    mime_type: "text/plain".to_string(),
                    headers: vec![
                        Header {
                            name: "Subject".to_string(),
                            value: "Test Email".to_string(),
                        },
                        Header {
                            name: "From".to_string(),
                            value: "sender@example.com".to_string(),
                        },
                    ],
                    body: Some(MessagePartBody {
                        data: URL_SAFE.encode("This is the decoded body content."),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            })
        }
    }

    fn server() -> (GmailMcp, Arc<FakeGmail>) {
        let fake = Arc::new(FakeGmail::default());
        (GmailMcp::new(fake.clone(), &McpConfig::default()), fake)
    }

    #[tokio::test]
    async fn should_search_with_default_limit() {
        let (server, fake) = server();

        let result = server
            .search(Parameters(SearchRequest {
                query: "test".to_string(),
                max_results: None,
            }))
            .await
            .unwrap();

        assert!(!is_error(&result));
        let body = json_of(&result);
        assert_eq!(2, body["count"]);
        assert_eq!("123", body["messages"][0]["id"]);
        assert_eq!(vec![("test".to_string(), 50)], *fake.searches.lock().unwrap());
    }

    #[tokio::test]
    async fn should_read_decoded_message() {
        let (server, _) = server();

        let result = server
            .read(Parameters(ReadRequest {
                message_id: "123".to_string(),
                max_body_bytes: None,
            }))
            .await
            .unwrap();

        let text = text_of(&result);
        for expected in [
            r#""id":"123""#,
            r#""snippet":"Hello world""#,
            "Test Email",
            "sender@example.com",
            "This is the decoded body content.",
        ] {
            assert!(text.contains(expected), "missing {expected} in {text}");
        }
    }

    #[tokio::test]
    async fn should_truncate_body() {
        let (server, _) = server();

        let result = server
            .read(Parameters(ReadRequest {
                message_id: "123".to_string(),
                max_body_bytes: Some(10),
            }))
            .await
            .unwrap();

        assert_eq!(
            "This is th... [TRUNCATED]",
            json_of(&result)["payload"]["body"]["data"]
        );
    }

    #[tokio::test]
    async fn should_report_missing_message() {
        let (server, _) = server();

        let result = server
            .read(Parameters(ReadRequest {
                message_id: "nope".to_string(),
                max_body_bytes: None,
            }))
            .await
            .unwrap();

        assert!(is_error(&result));
        assert_eq!(
            "failed to get message: Requested entity was not found. (status 404)",
            text_of(&result)
        );
    }

    #[test]
    fn should_accept_float_limits() {
        let search: SearchRequest =
            serde_json::from_value(json!({"query": "is:unread", "maxResults": 10.0})).unwrap();
        assert_eq!(Some(10), search.max_results);

        let read: ReadRequest =
            serde_json::from_value(json!({"messageId": "123", "maxBodyBytes": 2500.0})).unwrap();
        assert_eq!(Some(2500), read.max_body_bytes);
    }

    #[test]
    fn should_mark_tools_read_only() {
        let (server, _) = server();

        assert_eq!(
            vec!["gmail_read", "gmail_search"],
            read_only_tools(&server.tool_router)
        );
    }

    #[test]
    fn should_honour_tool_allowlist() {
        let fake: Arc<dyn GmailApi> = Arc::new(FakeGmail::default());
        let config = McpConfig {
            tools: [("search".to_string(), true)].into_iter().collect(),
        };

        let server = GmailMcp::new(fake, &config);
        let names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();

        assert_eq!(vec!["gmail_search"], names);
    }
}
