use crate::obsidian::client::ObsidianClient;
use crate::obsidian::error::ObsidianError;
use reqwest::Method;

pub struct OpenService<'a> {
    client: &'a ObsidianClient,
}

impl<'a> OpenService<'a> {
    pub(crate) fn new(client: &'a ObsidianClient) -> Self {
        Self { client }
    }

    /// Open `path` in the Obsidian UI, in a new tab when `new_leaf` is set.
    pub async fn file(&self, path: &str, new_leaf: bool) -> Result<(), ObsidianError> {
        let mut url = self
            .client
            .endpoint(&format!("open/{}", path.trim_start_matches('/')))?;
        if new_leaf {
            url.query_pairs_mut().append_pair("newLeaf", "true");
        }

        self.client
            .send(self.client.request(Method::POST, url))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obsidian::client::tests::client_for;
    use wiremock::matchers::{method, path, path_regex, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn should_open_in_new_leaf() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/open/my(%20| )file\.md$"))
            .and(query_param("newLeaf", "true"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.open().file("my file.md", true).await.unwrap();
    }

    #[tokio::test]
    async fn should_not_send_new_leaf_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/open/today.md"))
            .and(query_param_is_missing("newLeaf"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.open().file("today.md", false).await.unwrap();
    }
}
