//! Error types for Scriptwright.
//!
//! Library crates use [`ScriptwrightError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Scriptwright operations.
#[derive(Debug, thiserror::Error)]
pub enum ScriptwrightError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level network error (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status on a primary content fetch. Fatal for the run;
    /// carries the response body as detail.
    #[error("fetch failed for {url}: HTTP {status}: {body}")]
    Fetch {
        url: String,
        status: u16,
        body: String,
    },

    /// Stack Exchange search API failure.
    #[error("search error: {0}")]
    Search(String),

    /// HTML-to-PDF conversion or authoring round-trip error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// File storage (persist/remove) error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Gemini API invocation error.
    #[error("generation error: {0}")]
    Generation(String),

    /// The model's response does not match the requested JSON schema.
    #[error("schema validation error: {message}")]
    SchemaValidation { message: String },

    /// A search item carries no answer marked as accepted.
    #[error("no accepted answer for question: {title}")]
    MissingAcceptedAnswer { title: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScriptwrightError>;

impl ScriptwrightError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a schema-validation error from any displayable message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaValidation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ScriptwrightError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = ScriptwrightError::Fetch {
            url: "https://example.com/page".into(),
            status: 503,
            body: "Service Unavailable".into(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Service Unavailable"));
    }

    #[test]
    fn missing_accepted_answer_names_the_question() {
        let err = ScriptwrightError::MissingAcceptedAnswer {
            title: "How do I batch setValues?".into(),
        };
        assert!(err.to_string().contains("How do I batch setValues?"));
    }
}
