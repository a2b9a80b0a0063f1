//! Projection Schema Synthesizer - the field layout of one projection type
//!
//! A schema is computed purely from a classified entity: scalar fields first in
//! declaration order, then one relation slot per relation property, also in
//! declaration order. The attribute side-channel is implicit on every schema.

use proc_macro2::{Ident, Span};
use projex_core::{
    Cardinality, ClassifiedEntity, Diagnostic, DiagnosticKind, EntityDeclaration, EntityRegistry,
    GeneratorConfig, PropertyDescriptor, PropertyKind, ScalarConversion, ScalarShape,
};
use quote::format_ident;
use std::collections::HashSet;
use syn::{parse_quote, Path, Type};

use crate::error::{CodegenError, CodegenResult};

/// Name of the attribute side-channel field on every projection
pub const ATTRIBUTES_FIELD: &str = "attributes";

/// A copied attribute of the projection
#[derive(Debug, Clone)]
pub struct ScalarField {
    pub name: String,
    pub ident: Ident,
    /// Type of the projection field, including the `Option` layer if nullable
    pub field_type: Type,
    pub nullable: bool,
    pub conversion: ScalarConversion,
    pub identity: bool,
}

/// A relation placeholder on the projection
#[derive(Debug, Clone)]
pub struct RelationSlotSpec {
    /// Slot name: the property name with its first letter lowercased
    pub name: String,
    pub ident: Ident,
    /// Selector builder taking a nested block
    pub with_ident: Ident,
    /// Field on the entity the slot is captured from
    pub property: Ident,
    pub cardinality: Cardinality,
    /// Declared type of the entity property, kept as the slot's source type
    pub source: Type,
    pub target: String,
    pub target_path: Path,
    pub target_projection: Ident,
    pub target_relations: Ident,
}

#[derive(Debug, Clone)]
pub struct ProjectionSchema {
    pub entity: String,
    pub entity_path: Path,
    pub projection: Ident,
    pub relations: Ident,
    pub identity: String,
    pub scalars: Vec<ScalarField>,
    pub slots: Vec<RelationSlotSpec>,
}

impl ProjectionSchema {
    /// Lay out the projection for `entity`.
    ///
    /// Relation targets are looked up in `registry` for their projection and
    /// entity paths; the classifier has already guaranteed they are registered.
    /// Properties that cannot become a field of their own are left out and
    /// reported; the identity keeps its field name over any later property.
    pub fn synthesize(
        entity: &ClassifiedEntity,
        registry: &EntityRegistry,
        config: &GeneratorConfig,
    ) -> CodegenResult<(Self, Vec<Diagnostic>)> {
        let name = entity.name();
        let identity = entity
            .identity()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| entity.declaration.identity.clone());

        let mut seen = HashSet::from([ATTRIBUTES_FIELD.to_string()]);
        let mut identity_reserved = entity.identity().is_some() && seen.insert(identity.clone());
        // Selector methods: one plain and one `_with` builder per slot
        let mut builders = HashSet::from(["is_empty".to_string()]);

        let mut diagnostics = Vec::new();
        let mut scalars = Vec::new();
        let mut slots = Vec::new();
        for property in &entity.properties {
            let field = if property.kind.is_relation() {
                slot_name(&property.name)
            } else {
                property.name.clone()
            };

            let (Some(ident), Some(_)) = (field_ident(&field), field_ident(&property.name)) else {
                diagnostics.push(Diagnostic::property(
                    name,
                    &property.name,
                    DiagnosticKind::InvalidIdentifier {
                        name: property.name.clone(),
                    },
                ));
                continue;
            };

            let claimed = if property.identity {
                std::mem::take(&mut identity_reserved)
            } else if property.kind.is_relation() {
                let with = format!("{}_with", field);
                let free = !seen.contains(&field) && !builders.contains(&field) && !builders.contains(&with);
                if free {
                    seen.insert(field.clone());
                    builders.insert(field.clone());
                    builders.insert(with);
                }
                free
            } else {
                seen.insert(field.clone())
            };
            if !claimed {
                diagnostics.push(Diagnostic::property(
                    name,
                    &property.name,
                    DiagnosticKind::FieldCollision { field },
                ));
                continue;
            }

            match &property.kind {
                PropertyKind::Scalar(shape) => {
                    scalars.push(Self::scalar_field(property, ident, shape, false));
                }
                PropertyKind::ScalarNullable(shape) => {
                    scalars.push(Self::scalar_field(property, ident, shape, true));
                }
                PropertyKind::RelationSingle { target } => {
                    slots.push(Self::relation_slot(name, property, Cardinality::Single, target, registry, config)?);
                }
                PropertyKind::RelationSingleOptional { target } => {
                    slots.push(Self::relation_slot(name, property, Cardinality::Optional, target, registry, config)?);
                }
                PropertyKind::RelationMany { target, .. } => {
                    slots.push(Self::relation_slot(name, property, Cardinality::Many, target, registry, config)?);
                }
            }
        }

        let schema = Self {
            entity: name.to_string(),
            entity_path: entity_path(&entity.declaration, config)?,
            projection: type_ident(name, &config.projection_suffix)?,
            relations: type_ident(name, &config.relations_suffix)?,
            identity,
            scalars,
            slots,
        };
        Ok((schema, diagnostics))
    }

    fn scalar_field(property: &PropertyDescriptor, ident: Ident, shape: &ScalarShape, nullable: bool) -> ScalarField {
        let inner = &shape.field_type;
        let field_type: Type = if nullable {
            parse_quote!(::core::option::Option<#inner>)
        } else {
            inner.clone()
        };

        ScalarField {
            name: property.name.clone(),
            ident,
            field_type,
            nullable,
            conversion: shape.conversion,
            identity: property.identity,
        }
    }

    fn relation_slot(
        entity: &str,
        property: &PropertyDescriptor,
        cardinality: Cardinality,
        target: &str,
        registry: &EntityRegistry,
        config: &GeneratorConfig,
    ) -> CodegenResult<RelationSlotSpec> {
        let declaration = registry.get(target).ok_or_else(|| CodegenError::InvalidPath {
            entity: entity.to_string(),
            path: target.to_string(),
        })?;

        let name = slot_name(&property.name);
        let ident = field_ident(&name).ok_or_else(|| CodegenError::invalid_identifier(entity, &name))?;
        let with_ident = format_ident!("{}_with", name);

        Ok(RelationSlotSpec {
            ident,
            with_ident,
            property: field_ident(&property.name)
                .ok_or_else(|| CodegenError::invalid_identifier(entity, &property.name))?,
            cardinality,
            source: property.declared.clone(),
            target: target.to_string(),
            target_path: entity_path(declaration, config)?,
            target_projection: type_ident(target, &config.projection_suffix)?,
            target_relations: type_ident(target, &config.relations_suffix)?,
            name,
        })
    }

    /// The scalar field carrying the entity's identity, if it survived synthesis
    pub fn identity_field(&self) -> Option<&ScalarField> {
        self.scalars.iter().find(|field| field.identity)
    }

    pub fn slot(&self, name: &str) -> Option<&RelationSlotSpec> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    pub fn scalar(&self, name: &str) -> Option<&ScalarField> {
        self.scalars.iter().find(|field| field.name == name)
    }

    /// Every field name in emission order, attributes last
    pub fn field_names(&self) -> Vec<&str> {
        self.scalars
            .iter()
            .map(|field| field.name.as_str())
            .chain(self.slots.iter().map(|slot| slot.name.as_str()))
            .chain(std::iter::once(ATTRIBUTES_FIELD))
            .collect()
    }
}

/// Relation slot name for a property: its first letter lowercased
pub fn slot_name(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Full path of an entity type as seen from generated code
pub fn entity_path(declaration: &EntityDeclaration, config: &GeneratorConfig) -> CodegenResult<Path> {
    let text = match &declaration.path {
        Some(path) => path.clone(),
        None => format!("{}::{}", config.entity_module, declaration.name),
    };
    syn::parse_str(&text).map_err(|_| CodegenError::InvalidPath {
        entity: declaration.name.clone(),
        path: text,
    })
}

fn type_ident(entity: &str, suffix: &str) -> CodegenResult<Ident> {
    syn::parse_str(&format!("{}{}", entity, suffix))
        .map_err(|_| CodegenError::invalid_identifier(entity, format!("{}{}", entity, suffix)))
}

/// Identifier for a field, falling back to a raw identifier for keywords
pub(crate) fn field_ident(name: &str) -> Option<Ident> {
    if let Ok(ident) = syn::parse_str::<Ident>(name) {
        return Some(ident);
    }

    let mut chars = name.chars();
    let word = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_');
    if word && !matches!(name, "_" | "self" | "Self" | "super" | "crate") {
        return Some(Ident::new_raw(name, Span::call_site()));
    }

    None
}
