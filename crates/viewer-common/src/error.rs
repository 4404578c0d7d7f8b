//! Error types for the forecast viewer.

use thiserror::Error;

/// Result type alias using ViewerError.
pub type ViewerResult<T> = Result<T, ViewerError>;

/// Primary error type for viewer operations.
#[derive(Debug, Clone, Error)]
pub enum ViewerError {
    // === Upstream Errors ===
    /// The API answered with `ok: false`. Messages are passed on verbatim.
    #[error("Upstream request failed: {}", .messages.join("; "))]
    Upstream { messages: Vec<String> },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    // === Session Errors ===
    #[error("Layer group not found: {0}")]
    UnknownGroup(String),

    #[error("Level {level} not available for {variable}")]
    UnknownLevel { variable: String, level: i32 },

    #[error("Job is not loaded yet")]
    NotReady,
}

impl ViewerError {
    /// Build an upstream error from an API error list.
    pub fn upstream<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ViewerError::Upstream {
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }

    /// Human-readable messages for the error presentation layer.
    ///
    /// Upstream errors keep their original list; everything else is a
    /// single message.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ViewerError::Upstream { messages } if !messages.is_empty() => messages.clone(),
            other => vec![other.to_string()],
        }
    }

    /// Whether the error originated outside this process.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ViewerError::Upstream { .. } | ViewerError::Transport(_) | ViewerError::Decode(_)
        )
    }
}

impl From<serde_json::Error> for ViewerError {
    fn from(err: serde_json::Error) -> Self {
        ViewerError::Decode(format!("JSON error: {}", err))
    }
}
