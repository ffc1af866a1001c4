use crate::obsidian::client::ObsidianClient;
use crate::obsidian::error::ObsidianError;
use crate::obsidian::models::{NOTE_JSON, Note, PatchOperation, TargetType};
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

const ACTIVE_PATH: &str = "active/";

/// The file currently focused in the Obsidian UI.
pub struct ActiveFileService<'a> {
    client: &'a ObsidianClient,
}

impl<'a> ActiveFileService<'a> {
    pub(crate) fn new(client: &'a ObsidianClient) -> Self {
        Self { client }
    }

    /// Raw markdown of the active file.
    pub async fn get(&self) -> Result<String, ObsidianError> {
        let url = self.client.endpoint(ACTIVE_PATH)?;
        self.client
            .send_text(self.client.request(Method::GET, url))
            .await
    }

    /// Active file with frontmatter, tags and stats.
    pub async fn get_note(&self) -> Result<Note, ObsidianError> {
        let url = self.client.endpoint(ACTIVE_PATH)?;
        self.client
            .send_json(self.client.request(Method::GET, url).header(ACCEPT, NOTE_JSON))
            .await
    }

    pub async fn append(&self, content: &str) -> Result<(), ObsidianError> {
        let url = self.client.endpoint(ACTIVE_PATH)?;
        let request = self
            .client
            .request(Method::POST, url)
            .header(CONTENT_TYPE, "text/markdown")
            .body(content.to_string());

        self.client.send(request).await
    }

    pub async fn delete(&self) -> Result<(), ObsidianError> {
        let url = self.client.endpoint(ACTIVE_PATH)?;
        self.client
            .send(self.client.request(Method::DELETE, url))
            .await
    }

    pub async fn patch(
        &self,
        operation: PatchOperation,
        target_type: TargetType,
        target: &str,
        content: &str,
    ) -> Result<(), ObsidianError> {
        let url = self.client.endpoint(ACTIVE_PATH)?;
        let request = patch_request(self.client, url, operation, target_type, target, content);

        self.client.send(request).await
    }
}

/// PATCH request addressing a heading, block or frontmatter field.
pub(crate) fn patch_request(
    client: &ObsidianClient,
    url: url::Url,
    operation: PatchOperation,
    target_type: TargetType,
    target: &str,
    content: &str,
) -> reqwest::RequestBuilder {
    client
        .request(Method::PATCH, url)
        .header("Operation", operation.as_str())
        .header("Target-Type", target_type.as_str())
        .header("Target", target)
        .header(CONTENT_TYPE, "text/markdown")
        .body(content.to_string())
}
