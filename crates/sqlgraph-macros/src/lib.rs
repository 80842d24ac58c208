//! Procedural macros for sqlgraph.
//!
//! `#[derive(Entity)]` turns a struct into a static mapping descriptor: a
//! table of property name, column name and accessor/mutator function
//! pointers, plus the relation fields joined entities attach to. Nothing is
//! discovered at runtime.
//!
//! Generated code refers to `::sqlgraph_core`, so crates using the derive
//! depend on `sqlgraph-core` (the `sqlgraph` facade re-exports it).

use proc_macro::TokenStream;
use quote::{format_ident, quote};

mod infer;
mod parse;

use parse::{EntityDef, parse_entity};

/// Derive macro for the `Entity` trait.
///
/// # Attributes
///
/// - `#[sqlgraph(table = "name")]` - Table name, may be schema qualified
///   (defaults to the lower-cased struct name)
/// - `#[sqlgraph(name = "Alias")]` - Name used in `{Alias.*}` macros
///   (defaults to the struct name)
/// - `#[sqlgraph(key)]` - Field is part of the key, in declaration order
/// - `#[sqlgraph(column = "name")]` - Override column name
/// - `#[sqlgraph(read_only)]` - Written out by statements but never mapped from rows
/// - `#[sqlgraph(skip)]` - Not mapped at all
/// - `#[sqlgraph(relation)]` - Relation field; implied for types containing `EntityRef<..>` or `WeakRef<..>`
///
/// Property types must implement `Clone`, `Into<Value>` and `FromValue`.
///
/// # Example
///
/// ```ignore
/// use sqlgraph::prelude::*;
///
/// #[derive(Debug, Default, Entity)]
/// #[sqlgraph(table = "users")]
/// struct User {
///     #[sqlgraph(key)]
///     id: i64,
///     name: String,
///     files: Vec<EntityRef<File>>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(sqlgraph))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let entity = match parse_entity(&input) {
        Ok(e) => e,
        Err(e) => return e.to_compile_error().into(),
    };

    generate_entity_impl(&entity).into()
}

fn generate_entity_impl(entity: &EntityDef) -> proc_macro2::TokenStream {
    let name = &entity.name;
    let entity_name = &entity.entity_name;
    let table_name = &entity.table_name;

    let keys: Vec<String> = entity.key_fields().map(|f| f.name.to_string()).collect();

    let properties = entity.property_fields().map(|field| {
        let field_name = &field.name;
        let field_name_str = field_name.to_string();
        let column = &field.column_name;
        let ty = &field.ty;
        let ty_str = quote!(#ty).to_string().replace(' ', "");
        let sql_type = infer::infer_sql_type(ty);

        let setter = if field.read_only {
            quote! {}
        } else {
            quote! {
                .setter(|entity: &mut #name, value: &::sqlgraph_core::Value| {
                    entity.#field_name = <#ty as ::sqlgraph_core::FromValue>::from_value(value)?;
                    ::core::result::Result::Ok(())
                })
            }
        };

        quote! {
            ::sqlgraph_core::PropertyRef::new(#field_name_str, #sql_type, #ty_str)
                .column(#column)
                .getter(|entity: &#name| {
                    ::sqlgraph_core::Value::from(::core::clone::Clone::clone(&entity.#field_name))
                })
                #setter
        }
    });

    let relation_fields: Vec<_> = entity.relation_fields().collect();
    let slot_fns = relation_fields.iter().map(|field| {
        let field_name = &field.name;
        let slot_fn = format_ident!("__slot_{}", field_name);
        quote! {
            fn #slot_fn(entity: &mut #name) -> &mut dyn ::sqlgraph_core::RelationSlot {
                &mut entity.#field_name
            }
        }
    });
    let relations = relation_fields.iter().map(|field| {
        let field_name = &field.name;
        let field_name_str = field_name.to_string();
        let slot_fn = format_ident!("__slot_{}", field_name);
        let ty = &field.ty;
        quote! {
            ::sqlgraph_core::RelationRef::new::<#ty>(#field_name_str, #slot_fn)
        }
    });

    quote! {
        impl ::sqlgraph_core::Entity for #name {
            const ENTITY_NAME: &'static str = #entity_name;
            const TABLE_NAME: &'static str = #table_name;
            const KEYS: &'static [&'static str] = &[#(#keys),*];

            fn properties() -> &'static [::sqlgraph_core::PropertyRef<Self>] {
                static PROPERTIES: &[::sqlgraph_core::PropertyRef<#name>] = &[
                    #(#properties),*
                ];
                PROPERTIES
            }

            fn relations() -> &'static [::sqlgraph_core::RelationRef<Self>] {
                #(#slot_fns)*
                static RELATIONS: &[::sqlgraph_core::RelationRef<#name>] = &[
                    #(#relations),*
                ];
                RELATIONS
            }
        }
    }
}
