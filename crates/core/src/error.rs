use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::ConfigError;

/// Result alias for fallible core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Hard failures of a generation run.
///
/// Problems with individual entities or properties are never reported through
/// this type; they become [`Diagnostic`]s and generation carries on.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unsupported schema document format: {extension}")]
    UnsupportedFormat { extension: String },
}

/// What went wrong with a single entity or property during generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The entity declares no property matching its identity name
    MissingIdentity { identity: String },
    /// The identity property exists but cannot carry a plain key
    InvalidIdentity { reason: String },
    /// Another entity with the same name was registered first
    DuplicateEntity,
    /// The declared type text is not a Rust type
    InvalidType { declared: String, reason: String },
    /// A relation points at a type with no registered projection schema
    UnregisteredTarget { target: String },
    /// A wrapper's element type is neither an entity nor a known scalar
    UnresolvableWrapperElement { wrapper: String, element: String },
    /// A name or path cannot be spelled in generated Rust
    InvalidIdentifier { name: String },
    /// Two properties map to the same projection field
    FieldCollision { field: String },
}

/// A non-fatal generation problem, scoped to an entity and optionally a property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub entity: String,
    pub property: Option<String>,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn entity(entity: impl Into<String>, kind: DiagnosticKind) -> Self {
        Self {
            entity: entity.into(),
            property: None,
            kind,
        }
    }

    pub fn property(
        entity: impl Into<String>,
        property: impl Into<String>,
        kind: DiagnosticKind,
    ) -> Self {
        Self {
            entity: entity.into(),
            property: Some(property.into()),
            kind,
        }
    }

    /// True when the whole entity was skipped rather than a single property
    pub fn drops_entity(&self) -> bool {
        self.property.is_none()
    }

    /// Emit this diagnostic through `tracing`
    pub fn log(&self) {
        if self.drops_entity() {
            tracing::error!(entity = %self.entity, "{}", self);
        } else {
            tracing::warn!(
                entity = %self.entity,
                property = self.property.as_deref().unwrap_or_default(),
                "{}",
                self
            );
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = match &self.property {
            Some(property) => format!("{}.{}", self.entity, property),
            None => self.entity.clone(),
        };

        match &self.kind {
            DiagnosticKind::MissingIdentity { identity } => write!(
                f,
                "{}: entity has no identity property '{}', skipping entity",
                location, identity
            ),
            DiagnosticKind::InvalidIdentity { reason } => {
                write!(f, "{}: invalid identity property: {}", location, reason)
            }
            DiagnosticKind::DuplicateEntity => {
                write!(f, "{}: entity is declared more than once, keeping the first", location)
            }
            DiagnosticKind::InvalidType { declared, reason } => write!(
                f,
                "{}: cannot parse declared type '{}': {}",
                location, declared, reason
            ),
            DiagnosticKind::UnregisteredTarget { target } => write!(
                f,
                "{}: relation target '{}' has no registered projection, dropping property",
                location, target
            ),
            DiagnosticKind::UnresolvableWrapperElement { wrapper, element } => write!(
                f,
                "{}: {}<{}> holds neither a registered entity nor a known scalar, dropping property",
                location, wrapper, element
            ),
            DiagnosticKind::InvalidIdentifier { name } if self.property.is_none() => write!(
                f,
                "{}: '{}' is not a valid Rust identifier or path, skipping entity",
                location, name
            ),
            DiagnosticKind::InvalidIdentifier { name } => write!(
                f,
                "{}: '{}' is not a valid Rust identifier, dropping property",
                location, name
            ),
            DiagnosticKind::FieldCollision { field } => write!(
                f,
                "{}: projection field '{}' is already taken, dropping property",
                location, field
            ),
        }
    }
}
