//! Schema-constrained generation via the Gemini API.
//!
//! Evidence blobs are uploaded through the Files API and attached to a
//! `generateContent` call whose response MIME type is `application/json`.
//! The request carries a [`GenerationSchema`] whose `description` field is
//! the active prompt text — the schema itself communicates the task.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};

use scriptwright_shared::{
    EvidenceDocument, GenerationResult, PDF_MIME_TYPE, Result, ScriptwrightError,
};

/// Production API base.
const API_BASE: &str = "https://generativelanguage.googleapis.com";

// ---------------------------------------------------------------------------
// Generation schema
// ---------------------------------------------------------------------------

/// Structural description constraining the model's output shape. Created
/// fresh per invocation from the active prompt text.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSchema {
    /// The active prompt text; the mechanism by which the task reaches the model.
    pub description: String,
    #[serde(rename = "type")]
    pub schema_type: &'static str,
    pub properties: SchemaProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaProperties {
    pub script: SchemaField,
    #[serde(rename = "descriptionOfScript")]
    pub description_of_script: SchemaField,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaField {
    pub description: &'static str,
    #[serde(rename = "type")]
    pub field_type: &'static str,
}

impl GenerationSchema {
    /// Build the fixed `{script, descriptionOfScript}` schema around `prompt`.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            description: prompt.into(),
            schema_type: "object",
            properties: SchemaProperties {
                script: SchemaField {
                    description: "Generated script.",
                    field_type: "string",
                },
                description_of_script: SchemaField {
                    description: "Description of the generated script.",
                    field_type: "string",
                },
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle to an uploaded file, bindable to a generation request.
#[derive(Debug, Clone)]
pub struct FileHandle {
    /// Server-assigned resource name (`files/...`).
    pub name: String,
    /// URI referenced from `file_data` parts.
    pub uri: String,
    /// MIME type the server recorded.
    pub mime_type: String,
}

/// Client for the Gemini Files and generateContent APIs.
#[derive(Debug)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client for `model` (e.g. `models/gemini-1.5-flash-latest`).
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        if model.is_empty() {
            return Err(ScriptwrightError::config("Gemini model must be set"));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ScriptwrightError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            model,
            base_url: API_BASE.to_string(),
        })
    }

    /// Point the client at a different API base (for tests with mock servers).
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into();
        self
    }

    /// Upload evidence blobs through the Files API, in order.
    #[instrument(skip_all, fields(count = documents.len()))]
    pub async fn upload_files(&self, documents: &[EvidenceDocument]) -> Result<Vec<FileHandle>> {
        let mut handles = Vec::with_capacity(documents.len());

        for document in documents {
            let response = self
                .http
                .post(format!("{}/upload/v1beta/files", self.base_url))
                .query(&[("key", self.api_key.as_str())])
                .header("X-Goog-Upload-Protocol", "raw")
                .header("X-Goog-File-Name", &document.name)
                .header(reqwest::header::CONTENT_TYPE, PDF_MIME_TYPE)
                .body(document.bytes.clone())
                .send()
                .await
                .map_err(|e| ScriptwrightError::Generation(format!("file upload failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ScriptwrightError::Generation(format!(
                    "file upload returned HTTP {status}: {body}"
                )));
            }

            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| ScriptwrightError::Generation(format!("upload response: {e}")))?;

            let file = body.get("file").ok_or_else(|| {
                ScriptwrightError::Generation("upload response missing file object".into())
            })?;
            let handle = FileHandle {
                name: json_str(file, "name")?,
                uri: json_str(file, "uri")?,
                mime_type: file
                    .get("mimeType")
                    .and_then(|v| v.as_str())
                    .unwrap_or(PDF_MIME_TYPE)
                    .to_string(),
            };

            info!(name = %handle.name, source = %document.name, "file uploaded");
            handles.push(handle);
        }

        Ok(handles)
    }

    /// Invoke `generateContent`, constraining the output to `schema`. The
    /// serialized schema is the text part; each uploaded file becomes a
    /// `file_data` part bound to this request.
    #[instrument(skip_all, fields(model = %self.model, attachments = files.len()))]
    pub async fn generate(
        &self,
        schema: &GenerationSchema,
        files: &[FileHandle],
    ) -> Result<GenerationResult> {
        let schema_text = serde_json::to_string(schema)
            .map_err(|e| ScriptwrightError::Generation(format!("schema serialization: {e}")))?;

        let mut parts = vec![json!({ "text": schema_text })];
        for file in files {
            parts.push(json!({
                "file_data": { "file_uri": file.uri, "mime_type": file.mime_type }
            }));
        }

        let payload = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "response_mime_type": "application/json" },
        });

        let response = self
            .http
            .post(format!(
                "{}/v1beta/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| ScriptwrightError::Generation(format!("generateContent failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScriptwrightError::Generation(format!(
                "generateContent returned HTTP {status}: {body}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ScriptwrightError::Generation(format!("response body: {e}")))?;

        let text = body
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ScriptwrightError::Generation("response carries no candidate text".into())
            })?;

        // The model must honor the requested shape; anything else is a
        // schema violation, not a transport problem.
        let result: GenerationResult = serde_json::from_str(text).map_err(|e| {
            ScriptwrightError::schema(format!(
                "response does not match the requested schema: {e}"
            ))
        })?;

        info!(script_len = result.script.len(), "generation complete");
        Ok(result)
    }
}

fn json_str(value: &serde_json::Value, key: &str) -> Result<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ScriptwrightError::Generation(format!("upload response missing {key}")))
}
