use crate::obsidian::client::ObsidianClient;
use crate::obsidian::error::ObsidianError;
use crate::obsidian::models::Command;
use reqwest::Method;
use serde::Deserialize;

pub struct CommandService<'a> {
    client: &'a ObsidianClient,
}

#[derive(Deserialize)]
struct CommandList {
    #[serde(default)]
    commands: Vec<Command>,
}

impl<'a> CommandService<'a> {
    pub(crate) fn new(client: &'a ObsidianClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Command>, ObsidianError> {
        let url = self.client.endpoint("commands/")?;
        let list: CommandList = self
            .client
            .send_json(self.client.request(Method::GET, url))
            .await?;

        Ok(list.commands)
    }

    pub async fn execute(&self, command_id: &str) -> Result<(), ObsidianError> {
        let url = self.client.endpoint(&format!("commands/{}/", command_id))?;
        self.client
            .send(self.client.request(Method::POST, url))
            .await
    }
}
