use crate::obsidian::client::ObsidianClient;
use crate::obsidian::error::ObsidianError;
use crate::obsidian::models::{NOTE_JSON, Note};
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;

/// Files in the vault, addressed by their vault-relative path.
pub struct VaultService<'a> {
    client: &'a ObsidianClient,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<String>,
}

impl<'a> VaultService<'a> {
    pub(crate) fn new(client: &'a ObsidianClient) -> Self {
        Self { client }
    }

    /// List a directory, the vault root when `dir` is empty.
    pub async fn list(&self, dir: &str) -> Result<Vec<String>, ObsidianError> {
        let url = self.client.endpoint(&vault_path(dir))?;
        let list: FileList = self
            .client
            .send_json(self.client.request(Method::GET, url))
            .await?;

        Ok(list.files)
    }

    pub async fn get(&self, path: &str) -> Result<String, ObsidianError> {
        let url = self.client.endpoint(&vault_path(path))?;
        self.client
            .send_text(self.client.request(Method::GET, url))
            .await
    }

    pub async fn get_note(&self, path: &str) -> Result<Note, ObsidianError> {
        let url = self.client.endpoint(&vault_path(path))?;
        self.client
            .send_json(self.client.request(Method::GET, url).header(ACCEPT, NOTE_JSON))
            .await
    }

    /// Create the file, or replace its content when it exists.
    pub async fn create(&self, path: &str, content: &str) -> Result<(), ObsidianError> {
        let url = self.client.endpoint(&vault_path(path))?;
        let request = self
            .client
            .request(Method::PUT, url)
            .header(CONTENT_TYPE, "text/markdown")
            .body(content.to_string());

        self.client.send(request).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ObsidianError> {
        let url = self.client.endpoint(&vault_path(path))?;
        self.client
            .send(self.client.request(Method::DELETE, url))
            .await
    }
}

fn vault_path(path: &str) -> String {
    format!("vault/{}", path.trim_start_matches('/'))
}
