use std::io;

/// Errors that can occur during protogen operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unparseable proto file {file}:{line}: {message}")]
    ProtoParse {
        file: String,
        line: usize,
        message: String,
    },

    #[error("BUILD file parse error: {0}")]
    BuildFileParse(String),

    #[error("unknown directive: {0}")]
    UnknownDirective(String),

    #[error("invalid directive '{key} {value}': {message}")]
    InvalidDirective {
        key: String,
        value: String,
        message: String,
    },

    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    #[error("unknown rule kind: {0}")]
    UnknownRuleKind(String),

    #[error("invalid label {label:?}: {message}")]
    InvalidLabel { label: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("failed to render template {template}: {message}")]
    SchemaRender { template: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for protogen operations
pub type Result<T> = std::result::Result<T, Error>;
