//! Single-page conversion: fetch a URL, inline its images, render to PDF.

use std::time::Duration;

use reqwest::Client;
use tracing::{info, instrument};
use url::Url;

use scriptwright_shared::{EvidenceDocument, Result, ScriptwrightError};

use crate::render::{DocumentAuthoring, DocumentRenderer};

/// Name given to temporary documents during the authoring round-trip.
const TEMP_DOCUMENT_NAME: &str = "scriptwright-temp";

/// How the fetched HTML becomes a PDF. Caller-selected per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStrategy {
    /// Direct structural HTML-to-PDF conversion.
    Direct,
    /// Round-trip through a temporary editable document, for sources where
    /// direct conversion degrades fidelity.
    AuthoringRoundTrip,
}

/// Converts a single web page into a self-contained evidence document.
pub struct PageConverter<'a> {
    http: Client,
    renderer: &'a dyn DocumentRenderer,
    authoring: Option<&'a dyn DocumentAuthoring>,
}

impl<'a> PageConverter<'a> {
    pub fn new(
        renderer: &'a dyn DocumentRenderer,
        authoring: Option<&'a dyn DocumentAuthoring>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ScriptwrightError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            renderer,
            authoring,
        })
    }

    /// Fetch `url`, inline its images, and convert to a PDF blob named after
    /// the source URL. A non-success page fetch is fatal and carries the
    /// response body as detail.
    #[instrument(skip(self), fields(url = %url, ?strategy))]
    pub async fn convert(
        &self,
        url: &Url,
        strategy: ConversionStrategy,
    ) -> Result<EvidenceDocument> {
        let response = self
            .http
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ScriptwrightError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ScriptwrightError::Network(format!("{url}: body read failed: {e}")))?;

        if !status.is_success() {
            return Err(ScriptwrightError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let mut html = scriptwright_inline::inline_images(&self.http, &body).await;
        if is_medium_host(url) {
            html = scriptwright_inline::inline_medium_pictures(&self.http, &html).await;
        }

        let pdf = match strategy {
            ConversionStrategy::Direct => self.renderer.html_to_pdf(&html).await?,
            ConversionStrategy::AuthoringRoundTrip => {
                let authoring = self.authoring.ok_or_else(|| {
                    ScriptwrightError::Conversion(
                        "authoring round-trip requested but no authoring service configured"
                            .into(),
                    )
                })?;
                let id = authoring.create_document(TEMP_DOCUMENT_NAME, &html).await?;
                let exported = authoring.export_pdf(&id).await;
                // The temporary document is deleted regardless of export outcome.
                if let Err(e) = authoring.remove(&id).await {
                    tracing::warn!(id = %id, error = %e, "failed to delete temporary document");
                }
                exported?
            }
        };

        info!(pdf_bytes = pdf.len(), "page converted");
        Ok(EvidenceDocument::new(url.as_str(), pdf))
    }
}

/// Medium articles need the `<picture>` secondary inlining pass.
fn is_medium_host(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|h| h == "medium.com" || h.ends_with(".medium.com"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Renderer that records the HTML it was handed.
    struct RecordingRenderer {
        seen: Mutex<Vec<String>>,
    }

    impl RecordingRenderer {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DocumentRenderer for RecordingRenderer {
        async fn html_to_pdf(&self, html: &str) -> Result<Vec<u8>> {
            self.seen.lock().unwrap().push(html.to_string());
            Ok(b"%PDF rendered".to_vec())
        }
    }

    /// Authoring stub tracking create/export/remove call order.
    struct RecordingAuthoring {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentAuthoring for RecordingAuthoring {
        async fn create_document(&self, name: &str, _html: &str) -> Result<String> {
            self.calls.lock().unwrap().push(format!("create:{name}"));
            Ok("doc-1".into())
        }
        async fn export_pdf(&self, id: &str) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(format!("export:{id}"));
            Ok(b"%PDF exported".to_vec())
        }
        async fn remove(&self, id: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("remove:{id}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn direct_conversion_fetches_inlines_and_renders() {
        let server = MockServer::start().await;
        let page_html = format!(
            r#"<html><body><h1>Post</h1><img src="{}/pic.png"></body></html>"#,
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200).set_body_string(&page_html))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/pic.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![1, 2, 3])
                    .insert_header("content-type", "image/png"),
            )
            .mount(&server)
            .await;

        let renderer = RecordingRenderer::new();
        let converter = PageConverter::new(&renderer, None).expect("converter");
        let url = Url::parse(&format!("{}/article", server.uri())).expect("url");

        let doc = converter
            .convert(&url, ConversionStrategy::Direct)
            .await
            .expect("convert");

        assert_eq!(doc.name, url.as_str());
        assert_eq!(doc.bytes, b"%PDF rendered");

        // The renderer saw the inlined HTML, not the raw page.
        let seen = renderer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("data:image/png;base64,"));
        assert!(!seen[0].contains("/pic.png"));
    }

    #[tokio::test]
    async fn non_success_fetch_fails_with_body_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("access denied"))
            .mount(&server)
            .await;

        let renderer = RecordingRenderer::new();
        let converter = PageConverter::new(&renderer, None).expect("converter");
        let url = Url::parse(&format!("{}/page", server.uri())).expect("url");

        let err = converter
            .convert(&url, ConversionStrategy::Direct)
            .await
            .expect_err("must fail");

        match err {
            ScriptwrightError::Fetch { status, body, .. } => {
                assert_eq!(status, 403);
                assert_eq!(body, "access denied");
            }
            other => panic!("expected Fetch error, got {other}"),
        }
    }

    #[tokio::test]
    async fn authoring_round_trip_creates_exports_and_deletes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let renderer = RecordingRenderer::new();
        let authoring = RecordingAuthoring {
            calls: Mutex::new(Vec::new()),
        };
        let converter = PageConverter::new(&renderer, Some(&authoring)).expect("converter");
        let url = Url::parse(&format!("{}/page", server.uri())).expect("url");

        let doc = converter
            .convert(&url, ConversionStrategy::AuthoringRoundTrip)
            .await
            .expect("convert");

        assert_eq!(doc.bytes, b"%PDF exported");
        assert_eq!(
            *authoring.calls.lock().unwrap(),
            vec!["create:scriptwright-temp", "export:doc-1", "remove:doc-1"]
        );
        // Direct renderer never invoked.
        assert!(renderer.seen.lock().unwrap().is_empty());
    }

    /// Authoring stub whose export always fails.
    struct FailingExportAuthoring {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentAuthoring for FailingExportAuthoring {
        async fn create_document(&self, name: &str, _html: &str) -> Result<String> {
            self.calls.lock().unwrap().push(format!("create:{name}"));
            Ok("doc-9".into())
        }
        async fn export_pdf(&self, id: &str) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(format!("export:{id}"));
            Err(ScriptwrightError::Conversion("export blew up".into()))
        }
        async fn remove(&self, id: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("remove:{id}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_export_still_deletes_the_temporary_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let renderer = RecordingRenderer::new();
        let authoring = FailingExportAuthoring {
            calls: Mutex::new(Vec::new()),
        };
        let converter = PageConverter::new(&renderer, Some(&authoring)).expect("converter");
        let url = Url::parse(&format!("{}/page", server.uri())).expect("url");

        let err = converter
            .convert(&url, ConversionStrategy::AuthoringRoundTrip)
            .await
            .expect_err("export failure must propagate");

        assert!(matches!(err, ScriptwrightError::Conversion(_)));
        assert!(err.to_string().contains("export blew up"));
        // The temporary document is deleted even though export failed.
        assert_eq!(
            *authoring.calls.lock().unwrap(),
            vec!["create:scriptwright-temp", "export:doc-9", "remove:doc-9"]
        );
    }

    #[tokio::test]
    async fn round_trip_without_authoring_service_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let renderer = RecordingRenderer::new();
        let converter = PageConverter::new(&renderer, None).expect("converter");
        let url = Url::parse(&format!("{}/page", server.uri())).expect("url");

        let err = converter
            .convert(&url, ConversionStrategy::AuthoringRoundTrip)
            .await
            .expect_err("must fail");
        assert!(matches!(err, ScriptwrightError::Conversion(_)));
    }

    #[test]
    fn medium_host_detection() {
        let medium = Url::parse("https://medium.com/@author/post").unwrap();
        assert!(is_medium_host(&medium));
        let sub = Url::parse("https://engineering.medium.com/post").unwrap();
        assert!(is_medium_host(&sub));
        let other = Url::parse("https://example.com/medium.com").unwrap();
        assert!(!is_medium_host(&other));
    }
}
