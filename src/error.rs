use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppError {
    /// Rejected image candidate (type or size). Raised before any network call.
    #[error("{0}")]
    Validation(String),
    /// Non-2xx response or transport failure from the inference endpoint.
    #[error("{0}")]
    Service(String),
    /// Durable history could not be read or written.
    #[error("{0}")]
    Persistence(String),
    #[error("{0}")]
    Io(String),
    #[error("{0}")]
    Config(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Service(_) => "service",
            AppError::Persistence(_) => "persistence",
            AppError::Io(_) => "io",
            AppError::Config(_) => "config",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation(m)
            | AppError::Service(m)
            | AppError::Persistence(m)
            | AppError::Io(m)
            | AppError::Config(m) => m,
        }
    }
}

impl Serialize for AppError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AppError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", self.message())?;
        state.end()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Service(err.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Io(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Io(msg.to_string())
    }
}
