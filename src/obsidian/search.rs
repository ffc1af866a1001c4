use crate::obsidian::client::ObsidianClient;
use crate::obsidian::error::ObsidianError;
use crate::obsidian::models::{QueryResult, SearchResult};
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

const JSON_LOGIC: &str = "application/vnd.olrapi.jsonlogic+json";
const DATAVIEW_DQL: &str = "application/vnd.olrapi.dataview.dql+txt";

pub struct SearchService<'a> {
    client: &'a ObsidianClient,
}

impl<'a> SearchService<'a> {
    pub(crate) fn new(client: &'a ObsidianClient) -> Self {
        Self { client }
    }

    /// Plain text search. `context_length` is only sent when positive.
    pub async fn simple(
        &self,
        query: &str,
        context_length: u32,
    ) -> Result<Vec<SearchResult>, ObsidianError> {
        let mut url = self.client.endpoint("search/simple/")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            if context_length > 0 {
                pairs.append_pair("contextLength", &context_length.to_string());
            }
        }

        self.client
            .send_json(self.client.request(Method::POST, url))
            .await
    }

    pub async fn json_logic(&self, query: &Value) -> Result<Vec<QueryResult>, ObsidianError> {
        let url = self.client.endpoint("search/")?;
        let body = serde_json::to_string(query).map_err(ObsidianError::Decode)?;
        let request = self
            .client
            .request(Method::POST, url)
            .header(CONTENT_TYPE, JSON_LOGIC)
            .body(body);

        self.client.send_json(request).await
    }

    /// Dataview query language search, e.g. `TABLE file.mtime FROM #project`.
    pub async fn dataview(&self, dql: &str) -> Result<Vec<QueryResult>, ObsidianError> {
        let url = self.client.endpoint("search/")?;
        let request = self
            .client
            .request(Method::POST, url)
            .header(CONTENT_TYPE, DATAVIEW_DQL)
            .body(dql.to_string());

        self.client.send_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obsidian::client::tests::client_for;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn should_search_simple_with_context_length() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search/simple/"))
            .and(query_param("query", "test"))
            .and(query_param("contextLength", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"filename": "a.md", "score": 1.0,
                     "matches": [{"context": "a test", "match": {"start": 2, "end": 6}}]}]"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let results = client.search().simple("test", 100).await.unwrap();

        assert_eq!(1, results.len());
        assert_eq!("a.md", results[0].filename);
        assert_eq!(2, results[0].matches[0].span.start);
    }

    #[tokio::test]
    async fn should_omit_zero_context_length() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search/simple/"))
            .and(query_param_is_missing("contextLength"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let results = client.search().simple("nothing", 0).await.unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn should_post_json_logic_query() {
        let query = json!({"glob": [{"var": "path"}, "*.md"]});

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search/"))
            .and(header("content-type", JSON_LOGIC))
            .and(body_json(&query))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"[{"filename": "a.md", "result": true}]"#),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let results = client.search().json_logic(&query).await.unwrap();

        assert_eq!(vec![QueryResult { filename: "a.md".to_string(), result: json!(true) }], results);
    }
}
