//! # projex-codegen
//!
//! Build-time generator of projection types. A schema document lists the
//! entities to project; every surviving entity gets a serializable projection
//! struct, a selector namespace and an `impl Projection`.
//!
//! ```ignore
//! // build.rs
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     println!("cargo:rerun-if-changed=schema/blog.yaml");
//!     let out_dir = std::env::var("OUT_DIR")?;
//!     projex_codegen::CodeGenerator::from_path("schema/blog.yaml")?.generate_to(out_dir)?;
//!     Ok(())
//! }
//! ```

pub mod conversion;
pub mod error;
pub mod generator;
pub mod projection;
pub mod schema;
pub mod writer;

pub use error::{CodegenError, CodegenResult};
pub use generator::{GeneratedFile, GeneratedUnit, GenerationOutput, ProjectionGenerator};
pub use schema::{ProjectionSchema, RelationSlotSpec, ScalarField};
pub use writer::CodeWriter;

use projex_core::SchemaDocument;
use std::path::{Path, PathBuf};

/// Generates and writes projections for one schema document
pub struct CodeGenerator {
    pub document: SchemaDocument,
    writer: CodeWriter,
}

impl CodeGenerator {
    pub fn new(document: SchemaDocument) -> Self {
        Self {
            document,
            writer: CodeWriter::new(),
        }
    }

    /// Load a YAML or JSON schema document
    pub fn from_path(path: impl AsRef<Path>) -> CodegenResult<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "loading schema document");
        Ok(Self::new(SchemaDocument::from_path(path)?))
    }

    pub fn generate(&self) -> CodegenResult<GenerationOutput> {
        ProjectionGenerator::new(&self.document).generate()
    }

    /// Generate and write every file of the configured layout under `out_dir`.
    ///
    /// Returns the paths that were actually rewritten.
    pub fn generate_to(&self, out_dir: impl AsRef<Path>) -> CodegenResult<Vec<PathBuf>> {
        let config = &self.document.config;
        let output = self.generate()?;

        if config.fail_on_diagnostics && output.has_diagnostics() {
            return Err(CodegenError::Diagnostics {
                count: output.diagnostics.len(),
            });
        }

        let mut written = Vec::new();
        for file in output.render(config.layout)? {
            let path = out_dir.as_ref().join(&file.path);
            if self.writer.write_if_changed(&path, &file.content)? {
                written.push(path);
            }
        }

        tracing::info!(
            out_dir = %out_dir.as_ref().display(),
            written = written.len(),
            "projections written"
        );
        Ok(written)
    }
}
