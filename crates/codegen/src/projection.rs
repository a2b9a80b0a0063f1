//! Emission of the projection struct and its selector namespace

use proc_macro2::TokenStream;
use projex_core::Cardinality;
use quote::{quote, ToTokens};
use syn::Path;

use crate::schema::{ProjectionSchema, RelationSlotSpec};

/// Runtime paths shared by every emitter
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    pub root: Path,
    text: String,
}

impl RuntimePaths {
    pub fn new(root: Path) -> Self {
        let text = root.to_token_stream().to_string().replace(' ', "");
        Self { root, text }
    }

    /// String form of a runtime item, for use inside serde attributes
    pub fn item(&self, item: &str) -> String {
        format!("{}::{}", self.text, item)
    }
}

/// `pub struct <Name>Projection { .. }`
pub fn emit_struct(schema: &ProjectionSchema, runtime: &RuntimePaths) -> TokenStream {
    let rt = &runtime.root;
    let projection = &schema.projection;
    let serde_crate = runtime.item("serde");
    let skip_attributes = runtime.item("attributes::is_empty");

    let scalars = schema.scalars.iter().map(|field| {
        let ident = &field.ident;
        let ty = &field.field_type;
        quote! { pub #ident: #ty, }
    });

    let slots = schema.slots.iter().map(|slot| {
        let ident = &slot.ident;
        let ty = slot_type(slot, rt);
        let skip = match slot.cardinality {
            Cardinality::Optional => runtime.item("slot::is_vacant"),
            Cardinality::Single | Cardinality::Many => runtime.item("slot::is_unloaded"),
        };
        quote! {
            #[serde(skip_serializing_if = #skip)]
            pub #ident: #ty,
        }
    });

    let doc = format!(" Projection of [`{}`].", schema.entity);

    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, #rt::serde::Serialize)]
        #[serde(crate = #serde_crate)]
        pub struct #projection {
            #(#scalars)*
            #(#slots)*
            #[serde(skip_serializing_if = #skip_attributes)]
            pub attributes: #rt::Attributes,
        }
    }
}

/// `RelationSlot<Source, Loaded>` for one slot
pub fn slot_type(slot: &RelationSlotSpec, rt: &Path) -> TokenStream {
    let source = &slot.source;
    let target = &slot.target_projection;
    let loaded = match slot.cardinality {
        Cardinality::Single => quote!(#target),
        Cardinality::Optional => quote!(::core::option::Option<#target>),
        Cardinality::Many => quote!(::std::vec::Vec<#target>),
    };
    quote!(#rt::RelationSlot<#source, #loaded>)
}

/// `pub struct <Name>Relations` with one builder pair per slot.
///
/// Each selected slot holds the nested selection for its target, so a
/// selection is always a finite tree.
pub fn emit_selector(schema: &ProjectionSchema) -> TokenStream {
    let relations = &schema.relations;

    let fields = schema.slots.iter().map(|slot| {
        let ident = &slot.ident;
        let nested = &slot.target_relations;
        quote! { #ident: ::core::option::Option<::std::boxed::Box<#nested>>, }
    });

    let builders = schema.slots.iter().map(|slot| {
        let ident = &slot.ident;
        let with_ident = &slot.with_ident;
        let nested = &slot.target_relations;
        let load_doc = format!(" Load `{}`.", slot.name);
        let with_doc = format!(
            " Load `{}` and run `block` against the loaded {}.",
            slot.name,
            match slot.cardinality {
                Cardinality::Many => "projections",
                Cardinality::Single | Cardinality::Optional => "projection",
            }
        );

        quote! {
            #[doc = #load_doc]
            pub fn #ident(self) -> Self {
                self.#with_ident(|nested| nested)
            }

            #[doc = #with_doc]
            pub fn #with_ident<F>(mut self, block: F) -> Self
            where
                F: ::core::ops::FnOnce(#nested) -> #nested,
            {
                let nested = self.#ident.take().map(|nested| *nested).unwrap_or_default();
                self.#ident = ::core::option::Option::Some(::std::boxed::Box::new(block(nested)));
                self
            }
        }
    });

    let selected = schema.slots.iter().map(|slot| &slot.ident);
    let doc = format!(" Relations of [`{}`] that can be loaded.", schema.projection);

    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, Default)]
        pub struct #relations {
            #(#fields)*
        }

        impl #relations {
            #(#builders)*

            /// True when nothing is selected
            pub fn is_empty(&self) -> bool {
                true #(&& self.#selected.is_none())*
            }
        }
    }
}
