//! # projex-core
//!
//! Analysis side of the projection generator: entity declarations, the
//! registry of projected entities, and the property classifier that decides
//! which properties are attributes and which are relations.

pub mod classifier;
pub mod config;
pub mod declaration;
pub mod error;
pub mod registry;
pub mod types;

pub use classifier::{
    Cardinality, ClassifiedEntity, PropertyClassifier, PropertyDescriptor, PropertyKind,
    ScalarConversion, ScalarShape,
};
pub use config::{ConfigError, GeneratorConfig, OutputLayout};
pub use declaration::{EntityDeclaration, PropertyDeclaration, RelationMarker, SchemaDocument};
pub use error::{CoreError, CoreResult, Diagnostic, DiagnosticKind};
pub use registry::EntityRegistry;
pub use types::{PortableType, WrapperKind, WrapperTable};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
