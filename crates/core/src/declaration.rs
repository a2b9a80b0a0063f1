//! Entity declarations - the input side of a generation run
//!
//! A [`SchemaDocument`] lists every entity marked for projection together with
//! its ordered properties. Documents are usually read from YAML next to a
//! `build.rs`, but can also be assembled in code with the builder methods.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::GeneratorConfig;
use crate::error::{CoreError, CoreResult};

/// Informational cardinality marker on a relation property.
///
/// Markers document intent only: the classifier re-derives cardinality from
/// the declared type. A marked property whose type does not resolve to a
/// registered entity is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationMarker {
    HasOne,
    HasMany,
    BelongsTo,
    BelongsToMany,
}

/// A single declared property of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDeclaration {
    pub name: String,
    /// Declared Rust type, e.g. `String`, `Option<Arc<Like>>`, `Vec<Post>`
    #[serde(rename = "type")]
    pub ty: String,
    /// Exclusion marker; ignored for the identity property
    #[serde(default)]
    pub skip: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationMarker>,
}

impl PropertyDeclaration {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            skip: false,
            relation: None,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn with_relation(mut self, marker: RelationMarker) -> Self {
        self.relation = Some(marker);
        self
    }
}

/// An entity type marked for projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDeclaration {
    pub name: String,
    /// Full path of the entity type; defaults to `<entity_module>::<name>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default = "default_identity")]
    pub identity: String,
    #[serde(default)]
    pub properties: Vec<PropertyDeclaration>,
}

fn default_identity() -> String {
    "id".to_string()
}

impl EntityDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            identity: default_identity(),
            properties: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Append a plain property
    pub fn property(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.properties.push(PropertyDeclaration::new(name, ty));
        self
    }

    /// Append a fully built property declaration
    pub fn with_property(mut self, property: PropertyDeclaration) -> Self {
        self.properties.push(property);
        self
    }

    pub fn identity_property(&self) -> Option<&PropertyDeclaration> {
        self.properties.iter().find(|p| p.name == self.identity)
    }

    /// Properties the classifier should see: everything not skipped, plus the
    /// identity even when it carries the exclusion marker.
    pub fn eligible_properties(&self) -> impl Iterator<Item = &PropertyDeclaration> {
        self.properties
            .iter()
            .filter(move |p| !p.skip || p.name == self.identity)
    }
}

/// The full input of one generation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub config: GeneratorConfig,
    #[serde(default)]
    pub entities: Vec<EntityDeclaration>,
}

impl SchemaDocument {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            entities: Vec::new(),
        }
    }

    pub fn entity(mut self, entity: EntityDeclaration) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a document, picking the format from the file extension
    pub fn from_path(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        let document = match extension {
            "yaml" | "yml" => Self::from_yaml(&content)?,
            "json" => Self::from_json(&content)?,
            other => {
                return Err(CoreError::UnsupportedFormat {
                    extension: other.to_string(),
                })
            }
        };

        document.config.validate()?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOG: &str = r#"
config:
  entity_module: crate::model
entities:
  - name: User
    properties:
      - { name: id, type: "EntityId<i64>" }
      - { name: name, type: String }
      - { name: password_hash, type: String, skip: true }
      - { name: posts, type: "Vec<Post>", relation: has_many }
  - name: Post
    identity: key
    properties:
      - { name: key, type: u64, skip: true }
"#;

    #[test]
    fn test_yaml_document() {
        let document = SchemaDocument::from_yaml(BLOG).unwrap();
        assert_eq!(document.config.entity_module, "crate::model");
        assert_eq!(document.entities.len(), 2);

        let user = &document.entities[0];
        assert_eq!(user.identity, "id");
        assert_eq!(user.properties[3].relation, Some(RelationMarker::HasMany));
        assert!(user.properties[2].skip);

        let names: Vec<_> = user.eligible_properties().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "posts"]);
    }

    #[test]
    fn test_skipped_identity_stays_eligible() {
        let document = SchemaDocument::from_yaml(BLOG).unwrap();
        let post = &document.entities[1];
        assert_eq!(post.identity_property().map(|p| p.ty.as_str()), Some("u64"));
        assert_eq!(post.eligible_properties().count(), 1);
    }

    #[test]
    fn test_builder_matches_yaml_shape() {
        let entity = EntityDeclaration::new("Like")
            .property("id", "EntityId<i32>")
            .with_property(
                PropertyDeclaration::new("post", "Arc<Post>").with_relation(RelationMarker::BelongsTo),
            );

        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["properties"][1]["type"], "Arc<Post>");
        assert_eq!(json["properties"][1]["relation"], "belongs_to");
        assert!(json.get("path").is_none());
    }
}
