//! SQL type inference from Rust field types.

use crate::parse::is_option_type;
use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{GenericArgument, PathArguments, Type};

/// Infer the `SqlType` a field binds as, returning tokens that construct it.
///
/// `Option<T>` is unwrapped first; unrecognized types fall back to `Text`.
pub fn infer_sql_type(ty: &Type) -> TokenStream {
    let inner = unwrap_option_type(ty);
    let type_str = inner.to_token_stream().to_string().replace(' ', "");

    match type_str.as_str() {
        "bool" => quote! { ::sqlgraph_core::SqlType::Boolean },
        "i8" | "i16" | "i32" | "u8" | "u16" => quote! { ::sqlgraph_core::SqlType::Integer },
        "i64" | "u32" | "u64" => quote! { ::sqlgraph_core::SqlType::BigInt },
        "f32" | "f64" => quote! { ::sqlgraph_core::SqlType::Double },
        "String" | "&str" | "str" => quote! { ::sqlgraph_core::SqlType::Text },
        "Vec<u8>" | "&[u8]" | "[u8]" => quote! { ::sqlgraph_core::SqlType::Blob },
        "serde_json::Value" => quote! { ::sqlgraph_core::SqlType::Json },
        _ => quote! { ::sqlgraph_core::SqlType::Text },
    }
}

/// `Option<T>` -> `T`; any other type is returned as-is.
pub fn unwrap_option_type(ty: &Type) -> &Type {
    if !is_option_type(ty) {
        return ty;
    }
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if let PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(GenericArgument::Type(inner)) = args.args.first() {
                    return inner;
                }
            }
        }
    }
    ty
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn inferred(ty: Type) -> String {
        infer_sql_type(&ty).to_string().replace(' ', "")
    }

    #[test]
    fn primitives() {
        assert_eq!(inferred(parse_quote!(i64)), "::sqlgraph_core::SqlType::BigInt");
        assert_eq!(inferred(parse_quote!(i32)), "::sqlgraph_core::SqlType::Integer");
        assert_eq!(inferred(parse_quote!(bool)), "::sqlgraph_core::SqlType::Boolean");
        assert_eq!(inferred(parse_quote!(Vec<u8>)), "::sqlgraph_core::SqlType::Blob");
    }

    #[test]
    fn options_unwrap() {
        assert_eq!(
            inferred(parse_quote!(Option<f64>)),
            "::sqlgraph_core::SqlType::Double"
        );
        assert_eq!(
            inferred(parse_quote!(Option<String>)),
            "::sqlgraph_core::SqlType::Text"
        );
    }

    #[test]
    fn unknown_falls_back_to_text() {
        assert_eq!(inferred(parse_quote!(MyEnum)), "::sqlgraph_core::SqlType::Text");
    }
}
