use crate::derive_utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Item, parse_macro_input};

/// #[entity_id] 宏实现
/// 仅支持单字段 tuple struct；派生 Default, Clone, Debug, Serialize, Deserialize,
/// PartialEq, Eq, Hash, PartialOrd, Ord
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[entity_id] takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    let input = parse_macro_input!(item as Item);

    let st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[entity_id] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let inner_ty = match &st.fields {
        syn::Fields::Unnamed(f) if f.unnamed.len() == 1 => match f.unnamed.first() {
            Some(field) => field.ty.clone(),
            None => return single_field_error(f.span()),
        },
        syn::Fields::Unnamed(f) => return single_field_error(f.span()),
        _ => {
            return syn::Error::new(
                st.span(),
                "#[entity_id] supports only tuple struct, e.g., struct UserId(i64);",
            )
            .to_compile_error()
            .into();
        }
    };

    if !st.generics.params.is_empty() {
        return syn::Error::new(st.generics.span(), "#[entity_id] does not support generics")
            .to_compile_error()
            .into();
    }

    let mut st_out = st.clone();
    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Default),
        syn::parse_quote!(Clone),
        syn::parse_quote!(Debug),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(Eq),
        syn::parse_quote!(Hash),
        syn::parse_quote!(PartialOrd),
        syn::parse_quote!(Ord),
    ];
    apply_derives(&mut st_out.attrs, required);

    let ident = &st_out.ident;

    let out = quote! {
        #st_out

        impl #ident {
            pub fn new(value: #inner_ty) -> Self { Self(value) }
        }

        impl ::persistence_core::persistable::Identifier for #ident {
            fn to_value(&self) -> ::persistence_core::value::Value {
                ::persistence_core::persistable::Identifier::to_value(&self.0)
            }

            fn from_value(
                value: ::persistence_core::value::Value,
            ) -> ::persistence_core::error::PersistenceResult<Self> {
                <#inner_ty as ::persistence_core::persistable::Identifier>::from_value(value).map(Self)
            }
        }

        impl ::persistence_core::value::ValueType for #ident {
            const KIND: ::persistence_core::value::ValueKind =
                <#inner_ty as ::persistence_core::value::ValueType>::KIND;
        }

        impl ::core::convert::From<#ident> for ::persistence_core::value::Value {
            fn from(value: #ident) -> Self {
                ::persistence_core::persistable::Identifier::to_value(&value)
            }
        }

        impl ::persistence_core::sqlx::Type<::persistence_core::sqlx::Any> for #ident {
            fn type_info() -> ::persistence_core::sqlx::any::AnyTypeInfo {
                <#inner_ty as ::persistence_core::sqlx::Type<::persistence_core::sqlx::Any>>::type_info()
            }

            fn compatible(ty: &::persistence_core::sqlx::any::AnyTypeInfo) -> bool {
                <#inner_ty as ::persistence_core::sqlx::Type<::persistence_core::sqlx::Any>>::compatible(ty)
            }
        }

        impl<'r> ::persistence_core::sqlx::Decode<'r, ::persistence_core::sqlx::Any> for #ident {
            fn decode(
                value: <::persistence_core::sqlx::Any as ::persistence_core::sqlx::Database>::ValueRef<'r>,
            ) -> ::std::result::Result<Self, ::persistence_core::sqlx::error::BoxDynError> {
                <#inner_ty as ::persistence_core::sqlx::Decode<'r, ::persistence_core::sqlx::Any>>::decode(value)
                    .map(Self)
            }
        }

        impl ::std::str::FromStr for #ident
        where #inner_ty: ::std::str::FromStr
        {
            type Err = <#inner_ty as ::std::str::FromStr>::Err;
            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let inner: #inner_ty = s.parse()?;
                ::std::result::Result::Ok(Self(inner))
            }
        }

        impl ::std::fmt::Display for #ident
        where #inner_ty: ::std::fmt::Display
        {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{}", self.0)
            }
        }

        impl ::core::convert::From<#inner_ty> for #ident {
            fn from(value: #inner_ty) -> Self { Self(value) }
        }

        impl ::core::convert::From<#ident> for #inner_ty {
            fn from(value: #ident) -> Self { value.0 }
        }
    };

    TokenStream::from(out)
}

fn single_field_error(span: proc_macro2::Span) -> TokenStream {
    syn::Error::new(
        span,
        "#[entity_id] requires a tuple struct with exactly one field",
    )
    .to_compile_error()
    .into()
}
