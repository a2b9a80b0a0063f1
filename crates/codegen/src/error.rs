use projex_core::CoreError;
use thiserror::Error;

pub type CodegenResult<T> = Result<T, CodegenError>;

/// Hard failures while synthesizing or writing projection code
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("'{name}' on entity '{entity}' is not a usable Rust identifier")]
    InvalidIdentifier { entity: String, name: String },

    #[error("Invalid path '{path}' for entity '{entity}'")]
    InvalidPath { entity: String, path: String },

    #[error("Generated code for '{unit}' does not parse: {message}")]
    Emit { unit: String, message: String },

    #[error("Generation reported {count} diagnostic(s) and fail_on_diagnostics is set")]
    Diagnostics { count: usize },
}

impl CodegenError {
    pub fn invalid_identifier(entity: impl Into<String>, name: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            entity: entity.into(),
            name: name.into(),
        }
    }
}
