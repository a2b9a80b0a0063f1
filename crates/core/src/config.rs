use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

impl ConfigError {
    /// Create a missing required field error
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }
}

/// How generated source is split into files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// Every projection in one `projections.rs`
    #[default]
    SingleFile,
    /// One file per entity plus a `mod.rs` re-exporting them
    PerEntity,
}

/// Settings for one generation run, read from the `config:` section of a
/// schema document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Module path the entity types live in, as seen from the generated code
    pub entity_module: String,
    /// Path under which generated code reaches the runtime crate
    pub runtime_path: String,
    /// Appended to the entity name to form the projection type name
    pub projection_suffix: String,
    /// Appended to the entity name to form the selector namespace name
    pub relations_suffix: String,
    /// Extra storage-backed collection wrappers; these may only hold entities
    pub collection_wrappers: Vec<String>,
    /// Extra type names accepted as scalar collection elements
    pub scalar_types: Vec<String>,
    pub layout: OutputLayout,
    /// Treat any diagnostic as a failed run
    pub fail_on_diagnostics: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            entity_module: "crate::entities".to_string(),
            runtime_path: "::projex_runtime".to_string(),
            projection_suffix: "Projection".to_string(),
            relations_suffix: "Relations".to_string(),
            collection_wrappers: Vec::new(),
            scalar_types: Vec::new(),
            layout: OutputLayout::default(),
            fail_on_diagnostics: false,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::validate_path("entity_module", &self.entity_module)?;
        Self::validate_path("runtime_path", &self.runtime_path)?;

        if self.projection_suffix.is_empty() {
            return Err(ConfigError::missing_required(
                "projection_suffix",
                "projection types would shadow the entity types they mirror",
            ));
        }
        for (field, suffix) in [
            ("projection_suffix", &self.projection_suffix),
            ("relations_suffix", &self.relations_suffix),
        ] {
            if !suffix.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(ConfigError::invalid_value(field, suffix, "identifier characters"));
            }
        }
        if self.projection_suffix == self.relations_suffix {
            return Err(ConfigError::invalid_value(
                "relations_suffix",
                &self.relations_suffix,
                "a suffix different from projection_suffix",
            ));
        }

        for name in self.collection_wrappers.iter().chain(&self.scalar_types) {
            if syn::parse_str::<syn::Ident>(name).is_err() {
                return Err(ConfigError::invalid_value(
                    "collection_wrappers/scalar_types",
                    name,
                    "a bare type identifier",
                ));
            }
        }

        Ok(())
    }

    fn validate_path(field: &str, value: &str) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::missing_required(field, "expected a Rust module path"));
        }
        syn::parse_str::<syn::Path>(value)
            .map(|_| ())
            .map_err(|_| ConfigError::invalid_value(field, value, "a Rust module path"))
    }
}
