//! Error handling for the build pipeline
//!
//! This module provides idiomatic Rust error types using thiserror so that
//! every failure names the offending field or file precisely enough to fix
//! the input without reading source.

use thiserror::Error;

/// Main error type for the build pipeline
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Gradle error: {0}")]
    Gradle(#[from] GradleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration validation errors
///
/// Each check in the validator produces its own variant; validation is
/// all-or-nothing and the first failure aborts the run.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config root must be a JSON object")]
    NotAnObject,

    #[error("missing required field '{field}'")]
    MissingField { field: String },

    #[error("field '{field}' must be {expected}")]
    WrongType { field: String, expected: String },

    #[error("aes_key must be exactly 16 characters, got {length}")]
    KeyLength { length: usize },

    #[error("field '{field}' contains non printable-ASCII character {ch:?}")]
    NonPrintableAscii { field: String, ch: char },

    #[error("interference_char must be a single character, got {value:?}")]
    MarkerLength { value: String },

    #[error("interference_char {ch:?} is unsafe inside a generated character literal")]
    MarkerUnsafe { ch: char },

    #[error("field '{field}' is not a valid identifier: {value:?}")]
    InvalidIdentifier { field: String, value: String },

    #[error("field '{field}' is not a dotted package name with at least two segments: {value:?}")]
    InvalidPackage { field: String, value: String },

    #[error("abi_filters must be a non-empty array")]
    EmptyAbiList,

    #[error("unrecognized ABI {value:?}, expected one of: {allowed}")]
    UnknownAbi { value: String, allowed: String },

    #[error("'{present}' is set but '{missing}' is absent; sign_key and method_sign must be provided together")]
    UnpairedSigningField { present: String, missing: String },
}

/// Template loading and rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot read template '{name}': {source}")]
    TemplateRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no value bound for token {{{{{token}}}}} required by template '{template}'")]
    UnboundToken { token: String, template: String },

    #[error("template '{template}' contains unrecognized token {{{{{token}}}}}")]
    ResidualToken { token: String, template: String },
}

/// Artifact persistence errors
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("cannot write artifact '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot prepare destination directory '{path}': {source}")]
    PrepareDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot commit staged artifact '{path}': {source}")]
    Commit {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Downstream Gradle build errors
#[derive(Error, Debug)]
pub enum GradleError {
    #[error("cannot launch '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("gradle build failed with exit status {status}")]
    BuildFailed { status: String },
}

/// Result type aliases for convenience
pub type BuildResult<T> = Result<T, BuildError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type RenderResult<T> = Result<T, RenderError>;
