use proc_macro2::TokenStream;
use projex_core::{
    ClassifiedEntity, ConfigError, CoreError, Diagnostic, DiagnosticKind, EntityRegistry,
    OutputLayout, PropertyClassifier, SchemaDocument,
};
use quote::quote;
use std::collections::HashSet;
use std::path::PathBuf;
use syn::ext::IdentExt;
use syn::Path;

use crate::conversion::emit_projection_impl;
use crate::error::{CodegenError, CodegenResult};
use crate::projection::{emit_selector, emit_struct, RuntimePaths};
use crate::schema::{field_ident, ProjectionSchema};

const HEADER: &str = "// @generated by projex-codegen. Do not edit by hand.\n\n";

/// File name of the single-file layout
pub const SINGLE_FILE: &str = "projections.rs";

/// Generated code for one entity
#[derive(Debug, Clone)]
pub struct GeneratedUnit {
    pub entity: String,
    pub file_stem: String,
    pub schema: ProjectionSchema,
    pub tokens: TokenStream,
}

/// A rendered source file, relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub content: String,
}

/// Everything one generation run produced
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub units: Vec<GeneratedUnit>,
    pub diagnostics: Vec<Diagnostic>,
    entity_module: Path,
}

impl GenerationOutput {
    pub fn unit(&self, entity: &str) -> Option<&GeneratedUnit> {
        self.units.iter().find(|unit| unit.entity == entity)
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Render the units into source files for `layout`
    pub fn render(&self, layout: OutputLayout) -> CodegenResult<Vec<GeneratedFile>> {
        let entity_module = &self.entity_module;
        let prelude = quote! {
            #[allow(unused_imports)]
            use #entity_module::*;
        };

        match layout {
            OutputLayout::SingleFile => {
                let units = self.units.iter().map(|unit| &unit.tokens);
                let tokens = quote! {
                    #prelude
                    #(#units)*
                };
                Ok(vec![GeneratedFile {
                    path: PathBuf::from(SINGLE_FILE),
                    content: format_file("projections", tokens)?,
                }])
            }
            OutputLayout::PerEntity => {
                let mut files = Vec::with_capacity(self.units.len() + 1);
                for unit in &self.units {
                    let tokens = &unit.tokens;
                    files.push(GeneratedFile {
                        path: PathBuf::from(format!("{}.rs", unit.file_stem)),
                        content: format_file(&unit.entity, quote! {
                            #[allow(unused_imports)]
                            use super::*;
                            #tokens
                        })?,
                    });
                }

                let modules = self
                    .units
                    .iter()
                    .map(|unit| {
                        field_ident(&unit.file_stem)
                            .ok_or_else(|| CodegenError::invalid_identifier(&unit.entity, &unit.file_stem))
                    })
                    .collect::<CodegenResult<Vec<_>>>()?;
                files.push(GeneratedFile {
                    path: PathBuf::from("mod.rs"),
                    content: format_file("mod", quote! {
                        #prelude
                        #(mod #modules;)*
                        #(pub use #modules::*;)*
                    })?,
                });
                Ok(files)
            }
        }
    }
}

fn format_file(unit: &str, tokens: TokenStream) -> CodegenResult<String> {
    let file: syn::File = syn::parse2(tokens).map_err(|err| CodegenError::Emit {
        unit: unit.to_string(),
        message: err.to_string(),
    })?;
    Ok(format!("{}{}", HEADER, prettyplease::unparse(&file)))
}

/// Runs registry, classifier and synthesizers over a schema document
pub struct ProjectionGenerator<'a> {
    document: &'a SchemaDocument,
}

impl<'a> ProjectionGenerator<'a> {
    pub fn new(document: &'a SchemaDocument) -> Self {
        Self { document }
    }

    /// Generate every projection the document allows.
    ///
    /// Entity and property problems are collected as diagnostics and logged;
    /// only configuration and emission failures abort the run.
    pub fn generate(&self) -> CodegenResult<GenerationOutput> {
        let config = &self.document.config;
        config.validate().map_err(CoreError::from)?;
        let runtime = RuntimePaths::new(parse_config_path("runtime_path", &config.runtime_path)?);
        let entity_module = parse_config_path("entity_module", &config.entity_module)?;

        let (registry, mut diagnostics) = EntityRegistry::build(self.document);
        let classifier = PropertyClassifier::new(&registry, config);

        let mut classified = Vec::with_capacity(registry.len());
        for declaration in registry.entities() {
            let (entity, entity_diagnostics) = classifier.classify(declaration);
            diagnostics.extend(entity_diagnostics);
            classified.push(entity);
        }
        let classified = Self::drop_unidentified(classified, &mut diagnostics);

        let mut schemas = Vec::with_capacity(classified.len());
        for entity in &classified {
            let (schema, schema_diagnostics) = ProjectionSchema::synthesize(entity, &registry, config)?;
            diagnostics.extend(schema_diagnostics);
            schemas.push(schema);
        }
        let schemas = Self::drop_fieldless_identities(schemas, &mut diagnostics);

        let mut units = Vec::with_capacity(schemas.len());
        for schema in schemas {
            let struct_tokens = emit_struct(&schema, &runtime);
            let selector_tokens = emit_selector(&schema);
            let impl_tokens = emit_projection_impl(&schema, &runtime);

            tracing::debug!(
                entity = %schema.entity,
                scalars = schema.scalars.len(),
                slots = schema.slots.len(),
                "synthesized projection"
            );

            units.push(GeneratedUnit {
                entity: schema.entity.clone(),
                file_stem: file_stem(&schema.entity),
                tokens: quote! {
                    #struct_tokens
                    #selector_tokens
                    #impl_tokens
                },
                schema,
            });
        }

        for diagnostic in &diagnostics {
            diagnostic.log();
        }
        tracing::info!(
            generated = units.len(),
            declared = self.document.entities.len(),
            diagnostics = diagnostics.len(),
            "projection generation finished"
        );

        Ok(GenerationOutput {
            units,
            diagnostics,
            entity_module,
        })
    }

    /// Remove entities whose identity did not survive classification, along
    /// with every relation that pointed at them
    fn drop_unidentified(
        classified: Vec<ClassifiedEntity>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<ClassifiedEntity> {
        let (kept, dropped): (Vec<_>, Vec<_>) = classified
            .into_iter()
            .partition(|entity| {
                entity
                    .identity()
                    .is_some_and(|identity| !identity.kind.is_relation())
            });

        let dropped: HashSet<String> = dropped
            .into_iter()
            .map(|entity| {
                diagnostics.push(Diagnostic::entity(
                    entity.name(),
                    DiagnosticKind::InvalidIdentity {
                        reason: format!(
                            "identity property '{}' is not a plain scalar key",
                            entity.declaration.identity
                        ),
                    },
                ));
                entity.declaration.name
            })
            .collect();

        if dropped.is_empty() {
            return kept;
        }

        kept.into_iter()
            .map(|mut entity| {
                let name = entity.declaration.name.clone();
                entity.properties.retain(|property| match property.kind.target() {
                    Some(target) if dropped.contains(target) => {
                        diagnostics.push(Diagnostic::property(
                            &name,
                            &property.name,
                            DiagnosticKind::UnregisteredTarget {
                                target: target.to_string(),
                            },
                        ));
                        false
                    }
                    _ => true,
                });
                entity
            })
            .collect()
    }

    /// Remove schemas whose identity lost its field during synthesis, along
    /// with every slot that pointed at them
    fn drop_fieldless_identities(
        schemas: Vec<ProjectionSchema>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<ProjectionSchema> {
        let (kept, dropped): (Vec<_>, Vec<_>) = schemas
            .into_iter()
            .partition(|schema| schema.identity_field().is_some());

        let dropped: HashSet<String> = dropped
            .into_iter()
            .map(|schema| {
                diagnostics.push(Diagnostic::entity(
                    &schema.entity,
                    DiagnosticKind::InvalidIdentity {
                        reason: format!("identity property '{}' has no projection field", schema.identity),
                    },
                ));
                schema.entity
            })
            .collect();

        if dropped.is_empty() {
            return kept;
        }

        kept.into_iter()
            .map(|mut schema| {
                let entity = schema.entity.clone();
                schema.slots.retain(|slot| {
                    if !dropped.contains(&slot.target) {
                        return true;
                    }
                    diagnostics.push(Diagnostic::property(
                        &entity,
                        slot.property.unraw().to_string(),
                        DiagnosticKind::UnregisteredTarget {
                            target: slot.target.clone(),
                        },
                    ));
                    false
                });
                schema
            })
            .collect()
    }
}

fn parse_config_path(field: &str, value: &str) -> CodegenResult<Path> {
    syn::parse_str(value).map_err(|_| {
        CoreError::from(ConfigError::invalid_value(field, value, "a Rust module path")).into()
    })
}

/// `NullableLike` -> `nullable_like`; keywords that cannot be raw get a trailing `_`
pub fn file_stem(entity: &str) -> String {
    let mut stem = String::with_capacity(entity.len() + 4);
    let mut previous_lower = false;
    for c in entity.chars() {
        if c.is_uppercase() {
            if previous_lower {
                stem.push('_');
            }
            stem.extend(c.to_lowercase());
            previous_lower = false;
        } else {
            stem.push(c);
            previous_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    if matches!(stem.as_str(), "self" | "super" | "crate") {
        stem.push('_');
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use projex_core::{EntityDeclaration, GeneratorConfig};

    fn document() -> SchemaDocument {
        SchemaDocument::new(GeneratorConfig {
            collection_wrappers: vec!["Referrers".to_string()],
            ..GeneratorConfig::default()
        })
        .entity(
            EntityDeclaration::new("User")
                .property("id", "EntityId<i64>")
                .property("name", "String")
                .property("posts", "Referrers<Post>"),
        )
        .entity(
            EntityDeclaration::new("Post")
                .property("id", "EntityId<i64>")
                .property("author", "Arc<User>")
                .property("published", "Option<NaiveDateTime>"),
        )
        .entity(EntityDeclaration::new("Orphan").property("name", "String"))
    }

    #[test]
    fn test_generate_skips_entities_without_identity() {
        let document = document();
        let output = ProjectionGenerator::new(&document).generate().unwrap();

        let entities: Vec<_> = output.units.iter().map(|unit| unit.entity.as_str()).collect();
        assert_eq!(entities, vec!["User", "Post"]);
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].entity, "Orphan");
        assert!(output.diagnostics[0].drops_entity());
    }

    #[test]
    fn test_single_file_layout() {
        let document = document();
        let output = ProjectionGenerator::new(&document).generate().unwrap();
        let files = output.render(OutputLayout::SingleFile).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from(SINGLE_FILE));
        let content = &files[0].content;
        assert!(content.starts_with("// @generated"));
        assert!(content.contains("use crate::entities::*;"));
        assert!(content.contains("pub struct UserProjection"));
        assert!(content.contains("pub struct PostRelations"));
        assert!(content.contains("impl ::projex_runtime::Projection for PostProjection"));
    }

    #[test]
    fn test_per_entity_layout() {
        let document = document();
        let output = ProjectionGenerator::new(&document).generate().unwrap();
        let files = output.render(OutputLayout::PerEntity).unwrap();

        let paths: Vec<_> = files.iter().map(|file| file.path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("user.rs"), PathBuf::from("post.rs"), PathBuf::from("mod.rs")]
        );
        assert!(files[0].content.contains("use super::*;"));
        assert!(files[2].content.contains("mod user;"));
        assert!(files[2].content.contains("pub use post::*;"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let document = document();
        let first = ProjectionGenerator::new(&document).generate().unwrap();
        let second = ProjectionGenerator::new(&document).generate().unwrap();

        assert_eq!(
            first.render(OutputLayout::SingleFile).unwrap(),
            second.render(OutputLayout::SingleFile).unwrap()
        );
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut document = document();
        document.config.runtime_path = "not a path".to_string();

        let err = ProjectionGenerator::new(&document).generate().unwrap_err();
        assert!(matches!(err, CodegenError::Core(CoreError::Config(_))));
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("User"), "user");
        assert_eq!(file_stem("NullableLike"), "nullable_like");
        assert_eq!(file_stem("Post2Tag"), "post2_tag");
        assert_eq!(file_stem("Match"), "match");
        assert_eq!(file_stem("Crate"), "crate_");
    }

    #[test]
    fn test_per_entity_layout_with_keyword_stems() {
        let document = SchemaDocument::default()
            .entity(EntityDeclaration::new("Match").property("id", "i64"))
            .entity(EntityDeclaration::new("Crate").property("id", "i64"));
        let output = ProjectionGenerator::new(&document).generate().unwrap();
        let files = output.render(OutputLayout::PerEntity).unwrap();

        let paths: Vec<_> = files.iter().map(|file| file.path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("match.rs"), PathBuf::from("crate_.rs"), PathBuf::from("mod.rs")]
        );
        let module = &files[2].content;
        assert!(module.contains("mod r#match;"));
        assert!(module.contains("pub use r#match::*;"));
        assert!(module.contains("mod crate_;"));
    }

    #[test]
    fn test_bad_properties_do_not_stop_other_entities() {
        let document = SchemaDocument::default()
            .entity(EntityDeclaration::new("User").property("id", "i64").property("first-name", "String"))
            .entity(
                EntityDeclaration::new("Note")
                    .property("id", "i64")
                    .property("Owner", "Arc<User>")
                    .property("owner", "String"),
            );
        let output = ProjectionGenerator::new(&document).generate().unwrap();

        let entities: Vec<_> = output.units.iter().map(|unit| unit.entity.as_str()).collect();
        assert_eq!(entities, vec!["User", "Note"]);
        assert_eq!(output.unit("User").unwrap().schema.field_names(), vec!["id", "attributes"]);
        assert_eq!(
            output.unit("Note").unwrap().schema.field_names(),
            vec!["id", "owner", "attributes"]
        );

        let kinds: Vec<_> = output.diagnostics.iter().map(|d| d.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::InvalidIdentifier {
                    name: "first-name".to_string()
                },
                DiagnosticKind::FieldCollision {
                    field: "owner".to_string()
                },
            ]
        );
        assert!(output.render(OutputLayout::SingleFile).is_ok());
    }

    #[test]
    fn test_identity_without_field_drops_entity_and_referrers() {
        let document = SchemaDocument::default()
            .entity(EntityDeclaration::new("User").with_identity("attributes").property("attributes", "i64"))
            .entity(
                EntityDeclaration::new("Post")
                    .property("id", "i64")
                    .property("author", "Arc<User>"),
            );
        let output = ProjectionGenerator::new(&document).generate().unwrap();

        let entities: Vec<_> = output.units.iter().map(|unit| unit.entity.as_str()).collect();
        assert_eq!(entities, vec!["Post"]);
        assert!(output.unit("Post").unwrap().schema.slots.is_empty());
        assert!(output
            .diagnostics
            .iter()
            .any(|d| d.entity == "User" && d.drops_entity()));
        assert!(output.diagnostics.iter().any(|d| {
            d.entity == "Post"
                && d.property.as_deref() == Some("author")
                && matches!(d.kind, DiagnosticKind::UnregisteredTarget { .. })
        }));
    }

    #[test]
    fn test_entity_valued_identity_is_dropped() {
        let document = SchemaDocument::default()
            .entity(EntityDeclaration::new("User").property("id", "i64"))
            .entity(EntityDeclaration::new("Post").property("id", "Option<User>").property("title", "String"));
        let output = ProjectionGenerator::new(&document).generate().unwrap();

        let entities: Vec<_> = output.units.iter().map(|unit| unit.entity.as_str()).collect();
        assert_eq!(entities, vec!["User"]);
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].entity, "Post");
        assert!(matches!(output.diagnostics[0].kind, DiagnosticKind::InvalidIdentity { .. }));
    }
}
