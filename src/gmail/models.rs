use serde::{Deserialize, Serialize};

/// Gmail message resource as returned by `users.messages`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Message {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thread_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub snippet: String,
    /// int64 values are encoded as strings by the api
    #[serde(skip_serializing_if = "String::is_empty")]
    pub history_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub internal_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePart>,
    #[serde(skip_serializing_if = "is_zero")]
    pub size_estimate: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub part_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filename: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<MessagePartBody>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessagePartBody {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub attachment_id: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub size: i64,
    /// base64url encoded content, or plain text once truncated
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data: String,
}

/// Response of `users.messages.list`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ListMessagesResponse {
    pub messages: Vec<Message>,
    pub next_page_token: Option<String>,
    pub result_size_estimate: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}
