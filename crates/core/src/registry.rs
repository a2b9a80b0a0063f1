//! Entity Registry - the set of entities that receive a projection
//!
//! Built once per generation run from a [`SchemaDocument`]. The classifier
//! consults the registry to decide whether a declared type is an entity,
//! instead of looking at markers on every property.

use std::collections::{HashMap, HashSet};

use crate::declaration::{EntityDeclaration, SchemaDocument};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::types::{plain_type_name, type_text, WrapperKind, WrapperTable};

/// Read-only registry of projected entities, in declaration order
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: Vec<EntityDeclaration>,
    index: HashMap<String, usize>,
    /// Names declared for projection but rejected while building
    rejected: HashSet<String>,
}

impl EntityRegistry {
    /// Build the registry, reporting every entity that had to be left out
    pub fn build(document: &SchemaDocument) -> (Self, Vec<Diagnostic>) {
        let wrappers = WrapperTable::from_config(&document.config);
        let declared: HashSet<&str> = document.entities.iter().map(|e| e.name.as_str()).collect();

        let mut registry = Self::default();
        let mut diagnostics = Vec::new();

        for entity in &document.entities {
            if registry.index.contains_key(&entity.name) {
                diagnostics.push(Diagnostic::entity(&entity.name, DiagnosticKind::DuplicateEntity));
                continue;
            }

            let checked = Self::check_names(entity)
                .and_then(|()| Self::check_identity(entity, &wrappers, &declared));
            match checked {
                Ok(()) => {
                    tracing::debug!(entity = %entity.name, "registered entity for projection");
                    registry.index.insert(entity.name.clone(), registry.entities.len());
                    registry.entities.push(entity.clone());
                }
                Err(kind) => {
                    registry.rejected.insert(entity.name.clone());
                    diagnostics.push(Diagnostic::entity(&entity.name, kind));
                }
            }
        }

        // A name can be both registered and rejected only through duplicates;
        // the registered declaration wins.
        registry.rejected.retain(|name| !registry.index.contains_key(name));

        (registry, diagnostics)
    }

    /// The entity name becomes part of generated type names, and its path is spliced verbatim
    fn check_names(entity: &EntityDeclaration) -> Result<(), DiagnosticKind> {
        if syn::parse_str::<syn::Ident>(&entity.name).is_err() {
            return Err(DiagnosticKind::InvalidIdentifier {
                name: entity.name.clone(),
            });
        }
        match &entity.path {
            Some(path) if syn::parse_str::<syn::Path>(path).is_err() => {
                Err(DiagnosticKind::InvalidIdentifier { name: path.clone() })
            }
            _ => Ok(()),
        }
    }

    fn check_identity(
        entity: &EntityDeclaration,
        wrappers: &WrapperTable,
        declared: &HashSet<&str>,
    ) -> Result<(), DiagnosticKind> {
        let identity = entity
            .identity_property()
            .ok_or_else(|| DiagnosticKind::MissingIdentity {
                identity: entity.identity.clone(),
            })?;

        let ty: syn::Type = syn::parse_str(&identity.ty).map_err(|err| {
            DiagnosticKind::InvalidIdentity {
                reason: format!("cannot parse '{}': {}", identity.ty, err),
            }
        })?;

        // `Option` and pointer layers are transparent; whatever sits inside must be a plain key
        let mut target = &ty;
        while let Some(wrapped) = wrappers.unwrap(target) {
            match wrapped.kind {
                WrapperKind::Nullable | WrapperKind::Pointer => target = wrapped.element,
                WrapperKind::Collection | WrapperKind::RelationCollection => {
                    return Err(DiagnosticKind::InvalidIdentity {
                        reason: format!("'{}' is a wrapper, not a plain key", type_text(&ty)),
                    });
                }
            }
        }

        if plain_type_name(target).is_some_and(|name| declared.contains(name.as_str())) {
            return Err(DiagnosticKind::InvalidIdentity {
                reason: format!("'{}' refers to an entity, not a plain key", type_text(&ty)),
            });
        }

        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&EntityDeclaration> {
        self.index.get(name).map(|&idx| &self.entities[idx])
    }

    /// Was this name declared for projection but left out of the registry?
    pub fn is_rejected(&self, name: &str) -> bool {
        self.rejected.contains(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityDeclaration> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> SchemaDocument {
        SchemaDocument::default()
            .entity(EntityDeclaration::new("User").property("id", "EntityId<i64>").property("name", "String"))
            .entity(EntityDeclaration::new("Orphan").property("name", "String"))
            .entity(EntityDeclaration::new("User").property("id", "i64"))
            .entity(EntityDeclaration::new("Post").property("id", "Arc<User>"))
            .entity(EntityDeclaration::new("Tag").with_identity("slug").property("slug", "String"))
    }

    #[test]
    fn test_registry_keeps_declaration_order() {
        let (registry, _) = EntityRegistry::build(&document());
        let names: Vec<_> = registry.entities().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["User", "Tag"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("Tag"));
        assert_eq!(registry.get("User").unwrap().properties.len(), 2);
    }

    #[test]
    fn test_registry_reports_rejected_entities() {
        let (registry, diagnostics) = EntityRegistry::build(&document());

        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics.iter().all(Diagnostic::drops_entity));
        assert!(matches!(
            &diagnostics[0].kind,
            DiagnosticKind::MissingIdentity { identity } if identity == "id"
        ));
        assert_eq!(diagnostics[1].kind, DiagnosticKind::DuplicateEntity);
        assert!(matches!(diagnostics[2].kind, DiagnosticKind::InvalidIdentity { .. }));

        assert!(registry.is_rejected("Orphan"));
        assert!(registry.is_rejected("Post"));
        assert!(!registry.is_rejected("User"));
    }

    #[test]
    fn test_optional_entity_identity_is_rejected() {
        let document = SchemaDocument::default()
            .entity(EntityDeclaration::new("User").property("id", "i64"))
            .entity(EntityDeclaration::new("Post").property("id", "Option<User>").property("title", "String"))
            .entity(EntityDeclaration::new("Draft").property("id", "Option<Arc<User>>"))
            .entity(EntityDeclaration::new("Shelf").property("id", "Option<Vec<i64>>"))
            .entity(EntityDeclaration::new("Slug").property("id", "Option<Box<String>>"));

        let (registry, diagnostics) = EntityRegistry::build(&document);

        let rejected: Vec<_> = diagnostics.iter().map(|d| d.entity.as_str()).collect();
        assert_eq!(rejected, vec!["Post", "Draft", "Shelf"]);
        assert!(diagnostics
            .iter()
            .all(|d| matches!(d.kind, DiagnosticKind::InvalidIdentity { .. })));
        assert!(diagnostics[0].to_string().contains("refers to an entity"));
        assert!(registry.contains("Slug"));
    }

    #[test]
    fn test_unspellable_names_are_rejected() {
        let document = SchemaDocument::default()
            .entity(EntityDeclaration::new("User").property("id", "i64"))
            .entity(EntityDeclaration::new("blog-post").property("id", "i64"))
            .entity(EntityDeclaration::new("Note").with_path("crate::not a path::Note").property("id", "i64"));

        let (registry, diagnostics) = EntityRegistry::build(&document);

        assert_eq!(registry.len(), 1);
        assert!(registry.is_rejected("blog-post"));
        assert!(registry.is_rejected("Note"));
        assert!(diagnostics.iter().all(Diagnostic::drops_entity));
        assert_eq!(
            diagnostics[0].kind,
            DiagnosticKind::InvalidIdentifier {
                name: "blog-post".to_string()
            }
        );
    }
}
