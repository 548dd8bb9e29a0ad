//! Stack Overflow evidence search via the Stack Exchange API.
//!
//! One `search/advanced` request per call, no pagination loop. Results are
//! ranked by relevance descending and restricted to open questions with an
//! accepted answer. The request parameter set is built fresh per call; no
//! state is shared between calls.

use std::time::Duration;

use reqwest::Client;
use tracing::{info, instrument};

use scriptwright_shared::{Result, ScriptwrightError, SearchItem, SearchResponse};

/// Production endpoint for advanced search.
const API_URL: &str = "https://api.stackexchange.com/2.3/search/advanced";

/// Pre-registered response-shape filter: limits the payload to question
/// title/link/body/answers and answer body/is_accepted.
const RESPONSE_FILTER: &str = "!-tS9_NPV1puxkptfqnI5";

/// Hard upper bound the API accepts for `pagesize`.
const MAX_PAGE_SIZE: usize = 100;

/// Caller credentials for the Stack Exchange API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_token: String,
    pub key: String,
}

/// Client for the Stack Exchange search API.
pub struct SearchClient {
    http: Client,
    credentials: Credentials,
    api_url: String,
}

impl SearchClient {
    /// Create a new search client with the given credentials.
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ScriptwrightError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            credentials,
            api_url: API_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (for tests with mock servers).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Search questions matching `query` and all of `tags`, ranked by
    /// relevance descending. `page_size` is clamped to the API maximum of
    /// 100. Returns an empty list when nothing matches; propagates the API's
    /// HTTP failure when the request itself errors.
    #[instrument(skip(self), fields(query = %query, tags = tags.len()))]
    pub async fn search(
        &self,
        query: &str,
        tags: &[String],
        page_size: usize,
    ) -> Result<Vec<SearchItem>> {
        let page_size = page_size.min(MAX_PAGE_SIZE).to_string();
        let tagged = tags.join(";");

        // Built fresh per call: query/tags vary, everything else is fixed.
        let params: Vec<(&str, &str)> = vec![
            ("q", query),
            ("tagged", &tagged),
            ("access_token", &self.credentials.access_token),
            ("key", &self.credentials.key),
            ("pagesize", &page_size),
            ("order", "desc"),
            ("sort", "relevance"),
            ("accepted", "true"),
            ("closed", "false"),
            ("migrated", "false"),
            ("notice", "false"),
            ("wiki", "false"),
            ("site", "stackoverflow"),
            ("filter", RESPONSE_FILTER),
        ];

        let response = self
            .http
            .get(&self.api_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ScriptwrightError::Network(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScriptwrightError::Search(format!(
                "HTTP {status}: {body}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ScriptwrightError::Search(format!("invalid response body: {e}")))?;

        info!(items = parsed.items.len(), "search complete");
        Ok(parsed.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn test_client(server: &MockServer) -> SearchClient {
        SearchClient::new(Credentials {
            access_token: "token-1".into(),
            key: "key-1".into(),
        })
        .expect("client")
        .with_api_url(format!("{}/2.3/search/advanced", server.uri()))
    }

    const ITEMS_BODY: &str = r#"{
        "items": [
            {
                "title": "First question",
                "link": "https://stackoverflow.com/q/1",
                "body": "<p>body one</p>",
                "answers": [{"body": "<p>answer one</p>", "is_accepted": true}]
            },
            {
                "title": "Second question",
                "link": "https://stackoverflow.com/q/2",
                "body": "<p>body two</p>",
                "answers": [{"body": "<p>answer two</p>", "is_accepted": true}]
            }
        ]
    }"#;

    #[tokio::test]
    async fn search_sends_fixed_parameters_and_parses_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2.3/search/advanced"))
            .and(query_param("q", "move rows"))
            .and(query_param("tagged", "google-apps-script;google-sheets"))
            .and(query_param("pagesize", "100"))
            .and(query_param("order", "desc"))
            .and(query_param("sort", "relevance"))
            .and(query_param("accepted", "true"))
            .and(query_param("closed", "false"))
            .and(query_param("migrated", "false"))
            .and(query_param("notice", "false"))
            .and(query_param("wiki", "false"))
            .and(query_param("site", "stackoverflow"))
            .and(query_param("filter", RESPONSE_FILTER))
            .and(query_param("access_token", "token-1"))
            .and(query_param("key", "key-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ITEMS_BODY))
            .mount(&server)
            .await;

        let items = test_client(&server)
            .search(
                "move rows",
                &["google-apps-script".into(), "google-sheets".into()],
                100,
            )
            .await
            .expect("search");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "First question");
        assert!(items[1].accepted_answer().is_some());
    }

    #[tokio::test]
    async fn page_size_is_clamped_to_api_maximum() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("pagesize", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"items": []}"#))
            .mount(&server)
            .await;

        let items = test_client(&server)
            .search("q", &[], 500)
            .await
            .expect("search");
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn api_failure_propagates_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"error_id": 407, "error_message": "invalid filter"}"#,
            ))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .search("q", &[], 100)
            .await
            .expect_err("must fail");
        assert!(matches!(err, ScriptwrightError::Search(_)));
        assert!(err.to_string().contains("invalid filter"));
    }

    #[tokio::test]
    async fn consecutive_searches_do_not_share_state() {
        let server = MockServer::start().await;
        Mock::given(query_param("q", "first"))
            .and(query_param("tagged", "a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"items": []}"#))
            .mount(&server)
            .await;
        // The second call must carry only its own query/tags, so a matcher
        // that inspects the raw query string proves no parameter leaks over.
        Mock::given(query_param("q", "second"))
            .and(query_param("tagged", "b;c"))
            .and(|req: &Request| !req.url.query().unwrap_or("").contains("first"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"items": []}"#))
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.search("first", &["a".into()], 100).await.expect("first");
        client
            .search("second", &["b".into(), "c".into()], 100)
            .await
            .expect("second");
    }
}
