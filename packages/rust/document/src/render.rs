//! Collaborator seams for document conversion and storage.
//!
//! The pipeline itself never speaks PDF; it hands HTML to a
//! [`DocumentRenderer`] (or round-trips through a [`DocumentAuthoring`]
//! service) and hands finished blobs to a [`FileStorage`]. Each trait ships
//! with a default implementation; tests substitute mocks.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use scriptwright_shared::{EvidenceDocument, Result, ScriptwrightError, StoredFile};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Direct structural HTML-to-PDF conversion.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Render an HTML document to PDF bytes.
    async fn html_to_pdf(&self, html: &str) -> Result<Vec<u8>>;
}

/// Editable-document round-trip conversion, for sources where direct
/// conversion degrades fidelity.
#[async_trait]
pub trait DocumentAuthoring: Send + Sync {
    /// Create a temporary editable document from HTML; returns its id.
    async fn create_document(&self, name: &str, html: &str) -> Result<String>;
    /// Export the document as PDF bytes.
    async fn export_pdf(&self, id: &str) -> Result<Vec<u8>>;
    /// Delete the temporary document.
    async fn remove(&self, id: &str) -> Result<()>;
}

/// Persistent file storage for exported evidence documents.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persist a blob; returns its storage id and retrieval URL.
    async fn persist(&self, document: &EvidenceDocument) -> Result<StoredFile>;
    /// Remove a previously persisted blob.
    async fn remove(&self, id: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// HTTP renderer
// ---------------------------------------------------------------------------

/// [`DocumentRenderer`] backed by an HTTP rendering endpoint: POST the HTML,
/// receive the PDF bytes.
pub struct HttpRenderer {
    http: Client,
    endpoint: String,
}

impl HttpRenderer {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ScriptwrightError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl DocumentRenderer for HttpRenderer {
    async fn html_to_pdf(&self, html: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/html")
            .body(html.to_string())
            .send()
            .await
            .map_err(|e| ScriptwrightError::Conversion(format!("renderer request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScriptwrightError::Conversion(format!(
                "renderer returned HTTP {status}: {body}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ScriptwrightError::Conversion(format!("renderer body read: {e}")))?;

        debug!(pdf_bytes = bytes.len(), "rendered HTML to PDF");
        Ok(bytes.to_vec())
    }
}

// ---------------------------------------------------------------------------
// HTTP authoring round-trip
// ---------------------------------------------------------------------------

/// [`DocumentAuthoring`] backed by a document-authoring HTTP service:
/// create an editable document from HTML, export it as PDF, delete it.
pub struct HttpAuthoring {
    http: Client,
    endpoint: String,
}

impl HttpAuthoring {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ScriptwrightError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl DocumentAuthoring for HttpAuthoring {
    async fn create_document(&self, name: &str, html: &str) -> Result<String> {
        let payload = serde_json::json!({
            "name": name,
            "mimeType": "text/html",
            "content": html,
        });

        let response = self
            .http
            .post(format!("{}/documents", self.endpoint))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ScriptwrightError::Conversion(format!("authoring create failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScriptwrightError::Conversion(format!(
                "authoring create returned HTTP {status}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ScriptwrightError::Conversion(format!("authoring create body: {e}")))?;

        body.get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ScriptwrightError::Conversion("authoring create response missing id".into())
            })
    }

    async fn export_pdf(&self, id: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(format!("{}/documents/{id}/export", self.endpoint))
            .query(&[("format", "pdf")])
            .send()
            .await
            .map_err(|e| ScriptwrightError::Conversion(format!("authoring export failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScriptwrightError::Conversion(format!(
                "authoring export returned HTTP {status}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ScriptwrightError::Conversion(format!("authoring export body: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/documents/{id}", self.endpoint))
            .send()
            .await
            .map_err(|e| ScriptwrightError::Conversion(format!("authoring remove failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ScriptwrightError::Conversion(format!(
                "authoring remove returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Local file storage
// ---------------------------------------------------------------------------

/// [`FileStorage`] writing blobs into a local directory; `url` is a
/// `file://` URL, `id` is the file path.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Turn a display name into a filesystem-safe file name.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '?' | '#' | '&' | '=' => '-',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('-');
    if cleaned.is_empty() {
        "evidence.pdf".to_string()
    } else if cleaned.ends_with(".pdf") {
        cleaned.to_string()
    } else {
        format!("{cleaned}.pdf")
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn persist(&self, document: &EvidenceDocument) -> Result<StoredFile> {
        std::fs::create_dir_all(&self.root).map_err(|e| ScriptwrightError::io(&self.root, e))?;

        let path = self.root.join(sanitize_file_name(&document.name));
        std::fs::write(&path, &document.bytes).map_err(|e| ScriptwrightError::io(&path, e))?;

        // `Url::from_file_path` rejects relative paths, and the root is
        // commonly relative (the CLI defaults to ".").
        let path = std::path::absolute(&path).map_err(|e| ScriptwrightError::io(&path, e))?;
        let url = Url::from_file_path(&path)
            .map_err(|_| ScriptwrightError::Storage(format!("unrepresentable path: {path:?}")))?;

        info!(?path, bytes = document.bytes.len(), "evidence document persisted");
        Ok(StoredFile {
            id: path.to_string_lossy().into_owned(),
            url: url.to_string(),
        })
    }

    async fn remove(&self, id: &str) -> Result<()> {
        std::fs::remove_file(id).map_err(|e| ScriptwrightError::io(id, e))
    }
}
