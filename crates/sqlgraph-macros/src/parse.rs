//! Attribute parsing for `#[derive(Entity)]`.

use proc_macro2::Span;
use quote::ToTokens;
use syn::{Attribute, Data, DeriveInput, Error, Field, Fields, Ident, Lit, Result, Type};

/// A parsed entity struct.
#[derive(Debug)]
pub struct EntityDef {
    pub name: Ident,
    /// Name used by `{Name.*}` macros
    pub entity_name: String,
    pub table_name: String,
    pub fields: Vec<FieldDef>,
}

impl EntityDef {
    /// Column-mapped fields, in declaration order.
    pub fn property_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.skip && !f.relation)
    }

    pub fn relation_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.skip && f.relation)
    }

    pub fn key_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.property_fields().filter(|f| f.key)
    }
}

/// A parsed struct field.
#[derive(Debug)]
pub struct FieldDef {
    pub name: Ident,
    pub ty: Type,
    pub column_name: String,
    pub key: bool,
    pub skip: bool,
    pub read_only: bool,
    pub relation: bool,
}

/// Parse a derive input into an entity definition.
pub fn parse_entity(input: &DeriveInput) -> Result<EntityDef> {
    let name = input.ident.clone();

    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let (table_name, entity_name) = parse_struct_attrs(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => parse_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Entity can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Entity can only be derived for structs, not unions",
            ));
        }
    };

    Ok(EntityDef {
        entity_name: entity_name.unwrap_or_else(|| name.to_string()),
        table_name: table_name.unwrap_or_else(|| name.to_string().to_lowercase()),
        name,
        fields,
    })
}

fn string_value(meta: &syn::meta::ParseNestedMeta<'_>, what: &str) -> Result<String> {
    let value: Lit = meta.value()?.parse()?;
    if let Lit::Str(lit_str) = value {
        Ok(lit_str.value())
    } else {
        Err(Error::new_spanned(
            value,
            format!("expected string literal for {}", what),
        ))
    }
}

/// Parse struct-level `#[sqlgraph(...)]` attributes.
///
/// Supported keys: `table = "name"`, `name = "Alias"`.
fn parse_struct_attrs(attrs: &[Attribute]) -> Result<(Option<String>, Option<String>)> {
    let mut table_name = None;
    let mut entity_name = None;

    for attr in attrs {
        if !attr.path().is_ident("sqlgraph") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                if table_name.is_some() {
                    return Err(Error::new_spanned(
                        meta.path,
                        "duplicate sqlgraph attribute: table",
                    ));
                }
                table_name = Some(string_value(&meta, "table name")?);
            } else if meta.path.is_ident("name") {
                if entity_name.is_some() {
                    return Err(Error::new_spanned(
                        meta.path,
                        "duplicate sqlgraph attribute: name",
                    ));
                }
                entity_name = Some(string_value(&meta, "entity name")?);
            } else {
                return Err(Error::new_spanned(
                    meta.path,
                    "unknown sqlgraph struct attribute (expected `table` or `name`)",
                ));
            }
            Ok(())
        })?;
    }

    Ok((table_name, entity_name))
}

fn parse_fields(fields: &Fields) -> Result<Vec<FieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_field).collect(),
        Fields::Unnamed(_) => Err(Error::new(
            Span::call_site(),
            "Entity requires a struct with named fields, not a tuple struct",
        )),
        Fields::Unit => Err(Error::new(
            Span::call_site(),
            "Entity requires a struct with fields, not a unit struct",
        )),
    }
}

fn parse_field(field: &Field) -> Result<FieldDef> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut def = FieldDef {
        column_name: name.to_string(),
        name,
        ty: field.ty.clone(),
        key: false,
        skip: false,
        read_only: false,
        relation: is_relation_type(&field.ty),
    };
    let mut column = None;

    for attr in &field.attrs {
        if !attr.path().is_ident("sqlgraph") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("key") {
                def.key = true;
            } else if path.is_ident("skip") {
                def.skip = true;
            } else if path.is_ident("read_only") {
                def.read_only = true;
            } else if path.is_ident("relation") {
                def.relation = true;
            } else if path.is_ident("column") {
                column = Some(string_value(&meta, "column name")?);
            } else {
                return Err(Error::new_spanned(
                    path,
                    "unknown sqlgraph field attribute (expected `key`, `column`, `skip`, `read_only` or `relation`)",
                ));
            }
            Ok(())
        })?;
    }

    if let Some(column) = column {
        def.column_name = column;
    }

    if def.relation && (def.key || def.read_only) {
        return Err(Error::new_spanned(
            &def.name,
            "a relation field cannot also be `key` or `read_only`",
        ));
    }

    Ok(def)
}

/// Does the type mention `EntityRef<..>` or `WeakRef<..>` (directly or
/// inside a collection)?
pub fn is_relation_type(ty: &Type) -> bool {
    let normalized = ty.to_token_stream().to_string().replace(' ', "");
    ["EntityRef<", "WeakRef<"].iter().any(|&handle| {
        normalized.starts_with(handle)
            || normalized.contains(&format!("::{handle}"))
            || normalized.contains(&format!("<{handle}"))
    })
}

/// Check if a type is `Option<T>`.
pub fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn defaults_from_struct_name() {
        let input: DeriveInput = parse_quote! {
            struct UserAccount {
                #[sqlgraph(key)]
                id: i64,
                name: String,
            }
        };
        let def = parse_entity(&input).unwrap();
        assert_eq!(def.entity_name, "UserAccount");
        assert_eq!(def.table_name, "useraccount");
        assert_eq!(def.key_fields().count(), 1);
        assert_eq!(def.property_fields().count(), 2);
    }

    #[test]
    fn struct_overrides() {
        let input: DeriveInput = parse_quote! {
            #[sqlgraph(table = "app.users", name = "Usr")]
            struct User {
                #[sqlgraph(key, column = "user_id")]
                id: i64,
            }
        };
        let def = parse_entity(&input).unwrap();
        assert_eq!(def.table_name, "app.users");
        assert_eq!(def.entity_name, "Usr");
        assert_eq!(def.fields[0].column_name, "user_id");
        assert!(def.fields[0].key);
    }

    #[test]
    fn relation_fields_are_detected() {
        let input: DeriveInput = parse_quote! {
            struct User {
                #[sqlgraph(key)]
                id: i64,
                files: Vec<EntityRef<File>>,
                groups: Option<std::collections::HashSet<sqlgraph::EntityRef<Group>>>,
                #[sqlgraph(skip)]
                scratch: Vec<u8>,
                #[sqlgraph(read_only)]
                created: String,
            }
        };
        let def = parse_entity(&input).unwrap();
        let relations: Vec<_> = def.relation_fields().map(|f| f.name.to_string()).collect();
        assert_eq!(relations, vec!["files", "groups"]);
        let props: Vec<_> = def.property_fields().map(|f| f.name.to_string()).collect();
        assert_eq!(props, vec!["id", "created"]);
        assert!(def.fields[4].read_only);
    }

    #[test]
    fn rejects_unknown_attributes() {
        let input: DeriveInput = parse_quote! {
            struct User {
                #[sqlgraph(primary)]
                id: i64,
            }
        };
        let err = parse_entity(&input).unwrap_err();
        assert!(err.to_string().contains("unknown sqlgraph field attribute"));

        let input: DeriveInput = parse_quote! {
            #[sqlgraph(schema = "x")]
            struct User {
                id: i64,
            }
        };
        assert!(parse_entity(&input).is_err());
    }

    #[test]
    fn rejects_non_structs_and_generics() {
        let input: DeriveInput = parse_quote! {
            enum Kind { A, B }
        };
        assert!(parse_entity(&input).is_err());

        let input: DeriveInput = parse_quote! {
            struct Wrapper<T> { id: T }
        };
        assert!(parse_entity(&input).is_err());
    }

    #[test]
    fn option_detection() {
        assert!(is_option_type(&parse_quote!(Option<i64>)));
        assert!(is_option_type(&parse_quote!(std::option::Option<String>)));
        assert!(!is_option_type(&parse_quote!(Vec<u8>)));
        assert!(is_relation_type(&parse_quote!(Option<EntityRef<User>>)));
        assert!(!is_relation_type(&parse_quote!(Option<i64>)));
        assert!(is_relation_type(&parse_quote!(Option<sqlgraph::WeakRef<User>>)));
        assert!(!is_relation_type(&parse_quote!(Option<Weak<User>>)));
    }
}
