//! Declarative type tables used by the classifier
//!
//! Declared types are plain Rust type text. They are parsed with `syn` and
//! matched on the last path segment, so `Vec<Post>`, `std::vec::Vec<Post>` and
//! `alloc::vec::Vec<crate::model::Post>` all classify the same way.

use quote::ToTokens;
use std::collections::{BTreeSet, HashMap};
use syn::{GenericArgument, PathArguments, PathSegment, Type};

use crate::config::GeneratorConfig;

/// Recognized generic wrapper shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapperKind {
    /// `Option<T>`: the value may be absent
    Nullable,
    /// `Box<T>`, `Arc<T>`, `Rc<T>`: transparent for classification
    Pointer,
    /// `Vec<T>` and friends: entity elements make a relation, scalar elements a scalar
    Collection,
    /// Storage-backed lazy collections; the element must be an entity
    RelationCollection,
}

const STANDARD_WRAPPERS: &[(&str, WrapperKind)] = &[
    ("Option", WrapperKind::Nullable),
    ("Box", WrapperKind::Pointer),
    ("Arc", WrapperKind::Pointer),
    ("Rc", WrapperKind::Pointer),
    ("Vec", WrapperKind::Collection),
    ("VecDeque", WrapperKind::Collection),
    ("LinkedList", WrapperKind::Collection),
];

/// Adapter table mapping wrapper names to their shape.
///
/// Every entry extracts its element from the first type argument.
#[derive(Debug, Clone)]
pub struct WrapperTable {
    entries: HashMap<String, WrapperKind>,
}

impl Default for WrapperTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl WrapperTable {
    pub fn standard() -> Self {
        Self {
            entries: STANDARD_WRAPPERS
                .iter()
                .map(|(name, kind)| (name.to_string(), *kind))
                .collect(),
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        let mut table = Self::standard();
        for wrapper in &config.collection_wrappers {
            table.register(wrapper, WrapperKind::RelationCollection);
        }
        table
    }

    pub fn register(&mut self, name: impl Into<String>, kind: WrapperKind) {
        self.entries.insert(name.into(), kind);
    }

    pub fn kind_of(&self, name: &str) -> Option<WrapperKind> {
        self.entries.get(name).copied()
    }

    /// Match `ty` against the table, returning the wrapper kind, its name and
    /// the wrapped element type.
    pub fn unwrap<'t>(&self, ty: &'t Type) -> Option<Wrapped<'t>> {
        let segment = last_segment(ty)?;
        let kind = self.kind_of(&segment.ident.to_string())?;
        let element = first_type_argument(segment)?;
        Some(Wrapped {
            kind,
            wrapper: segment.ident.to_string(),
            element,
        })
    }

    /// Peel `Box`/`Arc`/`Rc` layers off a type
    pub fn strip_pointers<'t>(&self, mut ty: &'t Type) -> &'t Type {
        while let Some(wrapped) = self.unwrap(ty) {
            if wrapped.kind != WrapperKind::Pointer {
                break;
            }
            ty = wrapped.element;
        }
        ty
    }
}

/// A type matched against the wrapper table
#[derive(Debug, Clone)]
pub struct Wrapped<'t> {
    pub kind: WrapperKind,
    pub wrapper: String,
    pub element: &'t Type,
}

/// Substitutions applied to scalar types on their way into a projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortableType {
    /// Rendered to text through the runtime `Portable` trait
    Text,
}

const PORTABLE_TYPES: &[(&str, PortableType)] = &[
    ("NaiveDateTime", PortableType::Text),
    ("NaiveDate", PortableType::Text),
    ("NaiveTime", PortableType::Text),
    ("DateTime", PortableType::Text),
    ("Uuid", PortableType::Text),
];

impl PortableType {
    pub fn lookup(ty: &Type) -> Option<Self> {
        let name = type_name(ty)?;
        PORTABLE_TYPES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, portable)| *portable)
    }

    /// The type the projection field is declared with
    pub fn field_type(self) -> Type {
        match self {
            Self::Text => syn::parse_quote!(String),
        }
    }
}

/// Name of the runtime identity box unwrapped to its raw key
pub const IDENTITY_BOX: &str = "EntityId";

/// If `ty` is `EntityId<K>`, return `K`
pub fn identity_key(ty: &Type) -> Option<&Type> {
    let segment = last_segment(ty)?;
    if segment.ident != IDENTITY_BOX {
        return None;
    }
    first_type_argument(segment)
}

const PRIMITIVE_SCALARS: &[&str] = &[
    "bool", "char", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64",
    "u128", "usize", "f32", "f64", "String", "Value",
];

/// Types accepted as the element of a plain scalar collection
#[derive(Debug, Clone)]
pub struct ScalarSet {
    names: BTreeSet<String>,
}

impl ScalarSet {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        let names = PRIMITIVE_SCALARS
            .iter()
            .chain(PORTABLE_TYPES.iter().map(|(name, _)| name))
            .map(|name| name.to_string())
            .chain(config.scalar_types.iter().cloned())
            .collect();
        Self { names }
    }

    /// True for known scalar names, including nested `Option`/collections of them
    pub fn is_known(&self, ty: &Type, wrappers: &WrapperTable) -> bool {
        if let Some(wrapped) = wrappers.unwrap(ty) {
            return wrapped.kind != WrapperKind::RelationCollection
                && self.is_known(wrapped.element, wrappers);
        }
        if identity_key(ty).is_some() {
            return true;
        }
        match last_segment(ty) {
            Some(segment) => self.names.contains(&segment.ident.to_string()),
            None => false,
        }
    }
}

/// Last path segment of a plain type path (no qualified self type)
pub fn last_segment(ty: &Type) -> Option<&PathSegment> {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => type_path.path.segments.last(),
        Type::Group(group) => last_segment(&group.elem),
        Type::Paren(paren) => last_segment(&paren.elem),
        _ => None,
    }
}

/// Identifier of the last path segment
pub fn type_name(ty: &Type) -> Option<String> {
    last_segment(ty).map(|segment| segment.ident.to_string())
}

/// Name of a non-generic type path, the only shape an entity reference can take
pub fn plain_type_name(ty: &Type) -> Option<String> {
    let segment = last_segment(ty)?;
    match segment.arguments {
        PathArguments::None => Some(segment.ident.to_string()),
        _ => None,
    }
}

pub fn first_type_argument(segment: &PathSegment) -> Option<&Type> {
    if let PathArguments::AngleBracketed(args) = &segment.arguments {
        return args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        });
    }
    None
}

/// Render a type back to compact source text for diagnostics
pub fn type_text(ty: &Type) -> String {
    ty.to_token_stream()
        .to_string()
        .replace(" < ", "<")
        .replace(" <", "<")
        .replace("< ", "<")
        .replace(" >", ">")
        .replace(" :: ", "::")
        .replace(":: ", "::")
        .replace(" ,", ",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(text: &str) -> Type {
        syn::parse_str(text).unwrap()
    }

    #[test]
    fn test_wrapper_table_unwraps_qualified_paths() {
        let table = WrapperTable::standard();
        let declared = ty("std::collections::VecDeque<crate::model::Post>");
        let wrapped = table.unwrap(&declared).unwrap();
        assert_eq!(wrapped.kind, WrapperKind::Collection);
        assert_eq!(wrapped.wrapper, "VecDeque");
        assert_eq!(plain_type_name(wrapped.element).as_deref(), Some("Post"));
    }

    #[test]
    fn test_strip_pointers() {
        let table = WrapperTable::standard();
        let declared = ty("Arc<Box<User>>");
        assert_eq!(type_name(table.strip_pointers(&declared)).as_deref(), Some("User"));

        let declared = ty("Option<Arc<User>>");
        assert_eq!(type_name(table.strip_pointers(&declared)).as_deref(), Some("Option"));
    }

    #[test]
    fn test_configured_relation_collections() {
        let config = GeneratorConfig {
            collection_wrappers: vec!["Referrers".to_string()],
            ..Default::default()
        };
        let table = WrapperTable::from_config(&config);
        assert_eq!(table.kind_of("Referrers"), Some(WrapperKind::RelationCollection));
        assert_eq!(table.kind_of("HashMap"), None);
    }

    #[test]
    fn test_portable_and_identity_lookup() {
        assert_eq!(PortableType::lookup(&ty("chrono::NaiveDateTime")), Some(PortableType::Text));
        assert_eq!(PortableType::lookup(&ty("DateTime<Utc>")), Some(PortableType::Text));
        assert_eq!(PortableType::lookup(&ty("String")), None);

        let declared = ty("EntityId<i32>");
        assert_eq!(type_name(identity_key(&declared).unwrap()).as_deref(), Some("i32"));
        assert!(identity_key(&ty("i32")).is_none());
    }

    #[test]
    fn test_known_scalars() {
        let config = GeneratorConfig {
            scalar_types: vec!["Role".to_string()],
            ..Default::default()
        };
        let scalars = ScalarSet::from_config(&config);
        let wrappers = WrapperTable::standard();

        assert!(scalars.is_known(&ty("String"), &wrappers));
        assert!(scalars.is_known(&ty("Vec<Option<i64>>"), &wrappers));
        assert!(scalars.is_known(&ty("Role"), &wrappers));
        assert!(scalars.is_known(&ty("NaiveDate"), &wrappers));
        assert!(!scalars.is_known(&ty("Address"), &wrappers));
    }

    #[test]
    fn test_type_text_is_compact() {
        assert_eq!(type_text(&ty("Vec<Post>")), "Vec<Post>");
        assert_eq!(type_text(&ty("Option<Arc<Like>>")), "Option<Arc<Like>>");
    }
}
