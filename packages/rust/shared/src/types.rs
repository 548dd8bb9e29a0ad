//! Core domain types for the Scriptwright evidence pipeline.

use serde::{Deserialize, Serialize};

/// MIME type used for all rendered evidence blobs.
pub const PDF_MIME_TYPE: &str = "application/pdf";

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// One answer attached to a search item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Rendered HTML body of the answer.
    pub body: String,
    /// Whether the community marked this answer as accepted.
    #[serde(default)]
    pub is_accepted: bool,
}

/// A question returned by the Stack Exchange search API, with its answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchItem {
    /// Question title (may contain HTML entities, rendered as-is).
    pub title: String,
    /// Canonical link to the question.
    pub link: String,
    /// Rendered HTML body of the question.
    pub body: String,
    /// Answers in API order. Exactly one is expected to be accepted.
    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl SearchItem {
    /// The accepted answer, if any.
    pub fn accepted_answer(&self) -> Option<&Answer> {
        self.answers.iter().find(|a| a.is_accepted)
    }
}

/// Wire shape of the Stack Exchange search response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

// ---------------------------------------------------------------------------
// Evidence documents
// ---------------------------------------------------------------------------

/// A self-contained, portable PDF rendering of an HTML source, tagged with a
/// display name. Lives only for the duration of one run, from creation to
/// upload or discard.
#[derive(Debug, Clone)]
pub struct EvidenceDocument {
    /// Display name (source URL, or a fixed name for search evidence).
    pub name: String,
    /// The rendered PDF bytes.
    pub bytes: Vec<u8>,
}

impl EvidenceDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Handle returned by the file-storage collaborator after persisting a blob.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Storage-assigned identifier, usable with `remove`.
    pub id: String,
    /// Location the stored file can be retrieved from.
    pub url: String,
}

// ---------------------------------------------------------------------------
// Generation output
// ---------------------------------------------------------------------------

/// The schema-constrained output of a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// The generated script.
    pub script: String,
    /// Prose description of the generated script.
    #[serde(rename = "descriptionOfScript")]
    pub description_of_script: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_deserializes() {
        let json = r#"{
            "items": [{
                "title": "How to copy rows efficiently?",
                "link": "https://stackoverflow.com/q/1",
                "body": "<p>question body</p>",
                "answers": [
                    {"body": "<p>wrong</p>", "is_accepted": false},
                    {"body": "<p>right</p>", "is_accepted": true}
                ]
            }]
        }"#;
        let resp: SearchResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(resp.items.len(), 1);
        let accepted = resp.items[0].accepted_answer().expect("accepted answer");
        assert_eq!(accepted.body, "<p>right</p>");
    }

    #[test]
    fn search_item_without_accepted_answer() {
        let item = SearchItem {
            title: "t".into(),
            link: "https://stackoverflow.com/q/2".into(),
            body: "b".into(),
            answers: vec![Answer {
                body: "a".into(),
                is_accepted: false,
            }],
        };
        assert!(item.accepted_answer().is_none());
    }

    #[test]
    fn missing_answers_field_defaults_empty() {
        let json = r#"{"title": "t", "link": "https://x", "body": "b"}"#;
        let item: SearchItem = serde_json::from_str(json).expect("deserialize");
        assert!(item.answers.is_empty());
    }

    #[test]
    fn generation_result_uses_camel_case_field() {
        let json = r#"{"script": "function f() {}", "descriptionOfScript": "does nothing"}"#;
        let result: GenerationResult = serde_json::from_str(json).expect("deserialize");
        assert_eq!(result.script, "function f() {}");
        assert_eq!(result.description_of_script, "does nothing");

        let back = serde_json::to_string(&result).expect("serialize");
        assert!(back.contains("descriptionOfScript"));
    }
}
