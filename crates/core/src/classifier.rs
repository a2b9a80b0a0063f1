//! Property Classifier - sorts declared properties into attribute and relation shapes
//!
//! Cardinality is derived from the declared type alone. Relation markers are
//! only used to report properties that claim to be relations but point at
//! nothing projectable.

use syn::Type;

use crate::config::GeneratorConfig;
use crate::declaration::{EntityDeclaration, PropertyDeclaration};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::registry::EntityRegistry;
use crate::types::{
    identity_key, plain_type_name, type_text, PortableType, ScalarSet, WrapperKind, WrapperTable,
};

/// How a scalar value is copied from the entity into the projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarConversion {
    /// Plain `Clone`
    Clone,
    /// `EntityId<K>` reduced to its raw key
    IdentityKey,
    /// Substituted through the portable type table
    Portable(PortableType),
}

/// Field type and conversion for a scalar property, without any `Option` layer
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarShape {
    pub field_type: Type,
    pub conversion: ScalarConversion,
}

/// Relation cardinality as seen by the loader protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    Single,
    Optional,
    Many,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    Scalar(ScalarShape),
    ScalarNullable(ScalarShape),
    RelationSingle { target: String },
    RelationSingleOptional { target: String },
    RelationMany { target: String, wrapper: String },
}

impl PropertyKind {
    pub fn is_relation(&self) -> bool {
        self.cardinality().is_some()
    }

    pub fn cardinality(&self) -> Option<Cardinality> {
        match self {
            Self::RelationSingle { .. } => Some(Cardinality::Single),
            Self::RelationSingleOptional { .. } => Some(Cardinality::Optional),
            Self::RelationMany { .. } => Some(Cardinality::Many),
            Self::Scalar(_) | Self::ScalarNullable(_) => None,
        }
    }

    /// Name of the related entity, for relation kinds
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::RelationSingle { target }
            | Self::RelationSingleOptional { target }
            | Self::RelationMany { target, .. } => Some(target),
            Self::Scalar(_) | Self::ScalarNullable(_) => None,
        }
    }
}

/// A classified property
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub declared: Type,
    pub identity: bool,
    pub kind: PropertyKind,
}

/// An entity whose eligible properties have all been classified
#[derive(Debug, Clone)]
pub struct ClassifiedEntity {
    pub declaration: EntityDeclaration,
    pub properties: Vec<PropertyDescriptor>,
}

impl ClassifiedEntity {
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn identity(&self) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.identity)
    }

    pub fn scalars(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|p| !p.kind.is_relation())
    }

    pub fn relations(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|p| p.kind.is_relation())
    }
}

/// Classifies properties against a built [`EntityRegistry`]
pub struct PropertyClassifier<'r> {
    registry: &'r EntityRegistry,
    wrappers: WrapperTable,
    scalars: ScalarSet,
}

impl<'r> PropertyClassifier<'r> {
    pub fn new(registry: &'r EntityRegistry, config: &GeneratorConfig) -> Self {
        Self {
            registry,
            wrappers: WrapperTable::from_config(config),
            scalars: ScalarSet::from_config(config),
        }
    }

    /// Classify every eligible property of `entity`.
    ///
    /// Properties that fail classification are reported and left out; the
    /// rest of the entity is still classified.
    pub fn classify(&self, entity: &EntityDeclaration) -> (ClassifiedEntity, Vec<Diagnostic>) {
        let mut properties = Vec::new();
        let mut diagnostics = Vec::new();

        for property in entity.eligible_properties() {
            match self.classify_property(entity, property) {
                Ok(descriptor) => {
                    tracing::debug!(
                        entity = %entity.name,
                        property = %descriptor.name,
                        kind = ?descriptor.kind,
                        "classified property"
                    );
                    properties.push(descriptor);
                }
                Err(kind) => diagnostics.push(Diagnostic::property(&entity.name, &property.name, kind)),
            }
        }

        let classified = ClassifiedEntity {
            declaration: entity.clone(),
            properties,
        };
        (classified, diagnostics)
    }

    pub fn classify_property(
        &self,
        entity: &EntityDeclaration,
        property: &PropertyDeclaration,
    ) -> Result<PropertyDescriptor, DiagnosticKind> {
        let declared: Type = syn::parse_str(&property.ty).map_err(|err| DiagnosticKind::InvalidType {
            declared: property.ty.clone(),
            reason: err.to_string(),
        })?;

        let kind = self.classify_type(&declared)?;

        if property.relation.is_some() && !kind.is_relation() {
            return Err(DiagnosticKind::UnregisteredTarget {
                target: type_text(self.innermost(&declared)),
            });
        }

        Ok(PropertyDescriptor {
            name: property.name.clone(),
            declared,
            identity: property.name == entity.identity,
            kind,
        })
    }

    /// Classify a declared type on its own
    pub fn classify_type(&self, ty: &Type) -> Result<PropertyKind, DiagnosticKind> {
        if let Some(target) = self.resolve_entity(ty)? {
            return Ok(PropertyKind::RelationSingle { target });
        }

        let bare = self.wrappers.strip_pointers(ty);
        if let Some(wrapped) = self.wrappers.unwrap(bare) {
            match wrapped.kind {
                WrapperKind::Nullable => {
                    if let Some(target) = self.resolve_entity(wrapped.element)? {
                        return Ok(PropertyKind::RelationSingleOptional { target });
                    }
                    if self.holds_entity(wrapped.element) {
                        return Err(DiagnosticKind::UnresolvableWrapperElement {
                            wrapper: wrapped.wrapper,
                            element: type_text(wrapped.element),
                        });
                    }
                    return Ok(PropertyKind::ScalarNullable(self.scalar_shape(wrapped.element)));
                }
                WrapperKind::Collection | WrapperKind::RelationCollection => {
                    if let Some(target) = self.resolve_entity(wrapped.element)? {
                        return Ok(PropertyKind::RelationMany {
                            target,
                            wrapper: wrapped.wrapper,
                        });
                    }
                    if wrapped.kind == WrapperKind::Collection
                        && self.scalars.is_known(wrapped.element, &self.wrappers)
                    {
                        return Ok(PropertyKind::Scalar(self.scalar_shape(ty)));
                    }
                    return Err(DiagnosticKind::UnresolvableWrapperElement {
                        wrapper: wrapped.wrapper,
                        element: type_text(wrapped.element),
                    });
                }
                WrapperKind::Pointer => {}
            }
        }

        Ok(PropertyKind::Scalar(self.scalar_shape(ty)))
    }

    /// Registered entity behind `ty`, looking through pointer wrappers.
    ///
    /// A name that was declared for projection but rejected by the registry
    /// has no schema to point at and is an error.
    fn resolve_entity(&self, ty: &Type) -> Result<Option<String>, DiagnosticKind> {
        let Some(name) = plain_type_name(self.wrappers.strip_pointers(ty)) else {
            return Ok(None);
        };

        if self.registry.contains(&name) {
            Ok(Some(name))
        } else if self.registry.is_rejected(&name) {
            Err(DiagnosticKind::UnregisteredTarget { target: name })
        } else {
            Ok(None)
        }
    }

    fn holds_entity(&self, ty: &Type) -> bool {
        let bare = self.wrappers.strip_pointers(ty);
        if plain_type_name(bare).is_some_and(|name| self.registry.contains(&name)) {
            return true;
        }
        self.wrappers
            .unwrap(bare)
            .is_some_and(|wrapped| self.holds_entity(wrapped.element))
    }

    fn innermost<'t>(&self, mut ty: &'t Type) -> &'t Type {
        while let Some(wrapped) = self.wrappers.unwrap(ty) {
            ty = wrapped.element;
        }
        ty
    }

    fn scalar_shape(&self, ty: &Type) -> ScalarShape {
        if let Some(key) = identity_key(ty) {
            return ScalarShape {
                field_type: key.clone(),
                conversion: ScalarConversion::IdentityKey,
            };
        }
        if let Some(portable) = PortableType::lookup(ty) {
            return ScalarShape {
                field_type: portable.field_type(),
                conversion: ScalarConversion::Portable(portable),
            };
        }
        ScalarShape {
            field_type: ty.clone(),
            conversion: ScalarConversion::Clone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{RelationMarker, SchemaDocument};

    fn document() -> SchemaDocument {
        let config = GeneratorConfig {
            collection_wrappers: vec!["Referrers".to_string()],
            ..Default::default()
        };

        SchemaDocument::new(config)
            .entity(
                EntityDeclaration::new("User")
                    .property("name", "String")
                    .property("id", "EntityId<i64>")
                    .property("posts", "Referrers<Post>")
                    .property("tags", "Vec<String>"),
            )
            .entity(
                EntityDeclaration::new("Post")
                    .property("id", "EntityId<i64>")
                    .property("author", "Arc<User>")
                    .property("pinned", "Option<Box<Post>>")
                    .property("published_at", "Option<chrono::NaiveDateTime>")
                    .property("Comments", "Vec<Comment>"),
            )
            .entity(EntityDeclaration::new("Comment").property("body", "String"))
    }

    fn classify(entity: &str) -> (ClassifiedEntity, Vec<Diagnostic>) {
        let document = document();
        let (registry, _) = EntityRegistry::build(&document);
        let classifier = PropertyClassifier::new(&registry, &document.config);
        classifier.classify(registry.get(entity).unwrap())
    }

    #[test]
    fn test_scalars_and_identity() {
        let (user, diagnostics) = classify("User");
        assert!(diagnostics.is_empty());

        let identity = user.identity().unwrap();
        assert_eq!(identity.name, "id");
        match &identity.kind {
            PropertyKind::Scalar(shape) => {
                assert_eq!(shape.conversion, ScalarConversion::IdentityKey);
                assert_eq!(type_text(&shape.field_type), "i64");
            }
            other => panic!("unexpected identity kind: {:?}", other),
        }

        let tags = &user.properties[3];
        assert!(matches!(&tags.kind, PropertyKind::Scalar(shape) if shape.conversion == ScalarConversion::Clone));
    }

    #[test]
    fn test_relation_cardinalities() {
        let (user, _) = classify("User");
        assert_eq!(
            user.properties[2].kind,
            PropertyKind::RelationMany {
                target: "Post".to_string(),
                wrapper: "Referrers".to_string()
            }
        );

        let (post, diagnostics) = classify("Post");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(post.properties[1].kind.cardinality(), Some(Cardinality::Single));
        assert_eq!(post.properties[1].kind.target(), Some("User"));
        assert_eq!(post.properties[2].kind.cardinality(), Some(Cardinality::Optional));
        assert!(matches!(
            &post.properties[3].kind,
            PropertyKind::ScalarNullable(shape)
                if shape.conversion == ScalarConversion::Portable(PortableType::Text)
        ));
    }

    #[test]
    fn test_unregistered_target_drops_only_that_property() {
        let (post, diagnostics) = classify("Post");

        // Comment has no identity, so it never made it into the registry
        assert_eq!(post.properties.len(), 4);
        assert_eq!(diagnostics[0].property.as_deref(), Some("Comments"));
        assert_eq!(
            diagnostics[0].kind,
            DiagnosticKind::UnregisteredTarget {
                target: "Comment".to_string()
            }
        );
    }

    #[test]
    fn test_wrapper_element_errors() {
        let document = document();
        let (registry, _) = EntityRegistry::build(&document);
        let classifier = PropertyClassifier::new(&registry, &document.config);

        let ty = |text: &str| syn::parse_str::<Type>(text).unwrap();

        assert!(matches!(
            classifier.classify_type(&ty("Referrers<String>")),
            Err(DiagnosticKind::UnresolvableWrapperElement { wrapper, .. }) if wrapper == "Referrers"
        ));
        assert!(matches!(
            classifier.classify_type(&ty("Vec<Address>")),
            Err(DiagnosticKind::UnresolvableWrapperElement { element, .. }) if element == "Address"
        ));
        assert!(matches!(
            classifier.classify_type(&ty("Option<Vec<Post>>")),
            Err(DiagnosticKind::UnresolvableWrapperElement { .. })
        ));
        assert!(matches!(
            classifier.classify_type(&ty("Address")),
            Ok(PropertyKind::Scalar(_))
        ));
    }

    #[test]
    fn test_marker_on_scalar_is_reported() {
        let document = document();
        let (registry, _) = EntityRegistry::build(&document);
        let classifier = PropertyClassifier::new(&registry, &document.config);

        let entity = registry.get("User").unwrap();
        let property = PropertyDeclaration::new("profile", "Option<Arc<Profile>>")
            .with_relation(RelationMarker::HasOne);

        assert_eq!(
            classifier.classify_property(entity, &property),
            Err(DiagnosticKind::UnregisteredTarget {
                target: "Profile".to_string()
            })
        );
    }

    #[test]
    fn test_skipped_properties_except_identity() {
        let entity = EntityDeclaration::new("Secret")
            .with_property(PropertyDeclaration::new("id", "u64").skipped())
            .with_property(PropertyDeclaration::new("token", "String").skipped());
        let document = SchemaDocument::default().entity(entity);
        let (registry, _) = EntityRegistry::build(&document);
        let classifier = PropertyClassifier::new(&registry, &document.config);

        let (classified, diagnostics) = classifier.classify(registry.get("Secret").unwrap());
        assert!(diagnostics.is_empty());
        assert_eq!(classified.properties.len(), 1);
        assert!(classified.properties[0].identity);
    }

    #[test]
    fn test_invalid_type_text() {
        let document = SchemaDocument::default()
            .entity(EntityDeclaration::new("Broken").property("id", "i64").property("bad", "Vec<"));
        let (registry, _) = EntityRegistry::build(&document);
        let classifier = PropertyClassifier::new(&registry, &document.config);

        let (classified, diagnostics) = classifier.classify(registry.get("Broken").unwrap());
        assert_eq!(classified.properties.len(), 1);
        assert!(matches!(diagnostics[0].kind, DiagnosticKind::InvalidType { .. }));
    }
}
