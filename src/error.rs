use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the parser engine
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the parser engine.
///
/// None of these are recovered from inside a traversal: the first error aborts
/// the whole parse and is returned to the caller of [`crate::parser::Parser::execute`].
#[derive(Debug, Error)]
pub enum Error {
    /// Plugin pipeline or configuration file is invalid; raised before traversal starts
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A plugin tried to claim a schema fragment that another plugin already set
    #[error("structural error: {0}")]
    Structural(String),
    /// A model construct the pipeline has no schema representation for
    #[error("unsupported shape `{type_name}`: {reason}")]
    UnsupportedShape { type_name: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error in {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Error::Structural(message.into())
    }

    pub fn unsupported(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::UnsupportedShape {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}
