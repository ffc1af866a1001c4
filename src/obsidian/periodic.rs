use crate::obsidian::active_file::patch_request;
use crate::obsidian::client::ObsidianClient;
use crate::obsidian::error::ObsidianError;
use crate::obsidian::models::{NOTE_JSON, Note, PatchOperation, Period, TargetType};
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

/// Daily, weekly, ... notes managed by the periodic notes plugin.
pub struct PeriodicService<'a> {
    client: &'a ObsidianClient,
}

impl<'a> PeriodicService<'a> {
    pub(crate) fn new(client: &'a ObsidianClient) -> Self {
        Self { client }
    }

    pub async fn get_current(&self, period: Period) -> Result<String, ObsidianError> {
        let url = self.client.endpoint(&current_path(period))?;
        self.client
            .send_text(self.client.request(Method::GET, url))
            .await
    }

    pub async fn get_current_note(&self, period: Period) -> Result<Note, ObsidianError> {
        let url = self.client.endpoint(&current_path(period))?;
        self.client
            .send_json(self.client.request(Method::GET, url).header(ACCEPT, NOTE_JSON))
            .await
    }

    pub async fn append_to_current(&self, period: Period, content: &str) -> Result<(), ObsidianError> {
        let url = self.client.endpoint(&current_path(period))?;
        let request = self
            .client
            .request(Method::POST, url)
            .header(CONTENT_TYPE, "text/markdown")
            .body(content.to_string());

        self.client.send(request).await
    }

    pub async fn patch_current(
        &self,
        period: Period,
        operation: PatchOperation,
        target_type: TargetType,
        target: &str,
        content: &str,
    ) -> Result<(), ObsidianError> {
        let url = self.client.endpoint(&current_path(period))?;
        let request = patch_request(self.client, url, operation, target_type, target, content);

        self.client.send(request).await
    }

    pub async fn delete_current(&self, period: Period) -> Result<(), ObsidianError> {
        let url = self.client.endpoint(&current_path(period))?;
        self.client
            .send(self.client.request(Method::DELETE, url))
            .await
    }

    /// Raw markdown of the periodic note covering the given date.
    pub async fn get(
        &self,
        period: Period,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<String, ObsidianError> {
        let path = format!("periodic/{}/{}/{}/{}/", period, year, month, day);
        let url = self.client.endpoint(&path)?;
        self.client
            .send_text(self.client.request(Method::GET, url))
            .await
    }
}

fn current_path(period: Period) -> String {
    format!("periodic/{}/", period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obsidian::client::tests::client_for;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn should_get_current_daily_note() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/periodic/daily/"))
            .and(header("accept", NOTE_JSON))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"content": "today", "path": "daily/2026-10-19.md"}"#),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let note = client.periodic().get_current_note(Period::Daily).await.unwrap();

        assert_eq!("today", note.content);
        assert_eq!("daily/2026-10-19.md", note.path);
    }

    #[tokio::test]
    async fn should_address_note_by_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/periodic/weekly/2026/10/19/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("week 43"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let content = client
            .periodic()
            .get(Period::Weekly, 2026, 10, 19)
            .await
            .unwrap();

        assert_eq!("week 43", content);
    }
}
