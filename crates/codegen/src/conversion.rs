//! Conversion Synthesizer - `impl Projection` for one projection type

use proc_macro2::TokenStream;
use projex_core::{Cardinality, ScalarConversion};
use quote::quote;
use syn::Path;

use crate::projection::RuntimePaths;
use crate::schema::{ProjectionSchema, RelationSlotSpec, ScalarField};

/// `impl Projection for <Name>Projection { .. }`
pub fn emit_projection_impl(schema: &ProjectionSchema, runtime: &RuntimePaths) -> TokenStream {
    let rt = &runtime.root;
    let projection = &schema.projection;
    let relations = &schema.relations;
    let entity = &schema.entity_path;

    let scalars = schema.scalars.iter().map(|field| {
        let ident = &field.ident;
        let value = scalar_copy(field, rt);
        quote! { #ident: #value, }
    });

    let slots = schema.slots.iter().map(|slot| {
        let ident = &slot.ident;
        let property = &slot.property;
        let name = &slot.name;
        quote! {
            #ident: #rt::RelationSlot::new(#name, ::core::clone::Clone::clone(&entity.#property)),
        }
    });

    let apply = if schema.slots.is_empty() {
        quote! {
            async fn apply<X>(
                &mut self,
                _session: &X,
                _select: &Self::Select,
                _descent: #rt::Descent,
            ) -> #rt::RelationResult<()>
            where
                X: #rt::Session,
            {
                ::core::result::Result::Ok(())
            }
        }
    } else {
        let loads = schema.slots.iter().map(|slot| emit_load(slot, rt));
        quote! {
            async fn apply<X>(
                &mut self,
                session: &X,
                select: &Self::Select,
                descent: #rt::Descent,
            ) -> #rt::RelationResult<()>
            where
                X: #rt::Session,
            {
                #(#loads)*
                ::core::result::Result::Ok(())
            }
        }
    };

    quote! {
        #[#rt::async_trait]
        impl #rt::Projection for #projection {
            type Entity = #entity;
            type Select = #relations;

            fn from_entity(entity: &Self::Entity) -> Self {
                Self {
                    #(#scalars)*
                    #(#slots)*
                    attributes: ::core::default::Default::default(),
                }
            }

            #apply
        }
    }
}

/// Expression copying one scalar out of `entity`
fn scalar_copy(field: &ScalarField, rt: &Path) -> TokenStream {
    let ident = &field.ident;
    match (field.conversion, field.nullable) {
        (ScalarConversion::Clone, _) => quote!(::core::clone::Clone::clone(&entity.#ident)),
        (ScalarConversion::IdentityKey, false) => {
            quote!(::core::clone::Clone::clone(entity.#ident.value()))
        }
        (ScalarConversion::IdentityKey, true) => quote! {
            entity.#ident.as_ref().map(|key| ::core::clone::Clone::clone(key.value()))
        },
        (ScalarConversion::Portable(_), false) => quote!(#rt::Portable::to_portable(&entity.#ident)),
        (ScalarConversion::Portable(_), true) => quote! {
            entity.#ident.as_ref().map(|value| #rt::Portable::to_portable(value))
        },
    }
}

/// Load one selected slot, then run its nested selection on what was loaded
fn emit_load(slot: &RelationSlotSpec, rt: &Path) -> TokenStream {
    let ident = &slot.ident;
    let name = &slot.name;
    let target = &slot.target_projection;
    let target_path = &slot.target_path;

    let convert = quote! {
        <#target as #rt::Projection>::from_entity(
            ::core::borrow::Borrow::<#target_path>::borrow(&related),
        )
    };

    let (loader, loaded) = match slot.cardinality {
        Cardinality::Single => (
            quote!(|related| #convert),
            quote!(::core::iter::once(loaded)),
        ),
        Cardinality::Optional => (
            quote! {
                |source| ::core::iter::IntoIterator::into_iter(source)
                    .next()
                    .map(|related| #convert)
            },
            quote!(loaded.iter_mut()),
        ),
        Cardinality::Many => (
            quote! {
                |source| ::core::iter::IntoIterator::into_iter(source)
                    .map(|related| #convert)
                    .collect::<::std::vec::Vec<_>>()
            },
            quote!(loaded.iter_mut()),
        ),
    };

    quote! {
        if let ::core::option::Option::Some(nested) = select.#ident.as_deref() {
            let descent = descent.enter(#name)?;
            let loaded = self.#ident.load(session, #loader).await?;
            #rt::descend_each(#loaded, session, nested, descent).await?;
        }
    }
}
