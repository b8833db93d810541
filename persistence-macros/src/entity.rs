use crate::derive_utils::apply_derives;
use crate::field_utils::{ensure_id_field, take_columns};
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Item, LitStr, Result, Token, Type, parse::Parse, parse::ParseStream, parse_macro_input,
};

/// #[entity] 宏实现
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EntityAttrConfig);
    let input = parse_macro_input!(item as Item);

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[entity] only on struct")
                .to_compile_error()
                .into();
        }
    };

    if !st.generics.params.is_empty() {
        return syn::Error::new(st.generics.span(), "#[entity] does not support generic structs")
            .to_compile_error()
            .into();
    }

    let Some(table) = cfg.table else {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[entity] requires `table = \"...\"`",
        )
        .to_compile_error()
        .into();
    };

    // 仅支持具名字段结构体
    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return syn::Error::new(st.span(), "only supports named-field struct")
                .to_compile_error()
                .into();
        }
    };

    let id_type = cfg.id_ty.unwrap_or_else(|| syn::parse_quote! { i64 });
    ensure_id_field(fields_named, &id_type);

    let columns = match take_columns(fields_named) {
        Ok(c) => c,
        Err(e) => return e.to_compile_error().into(),
    };

    // 第一个字段总是 id
    let Some((id_field, rest)) = columns.split_first() else {
        return syn::Error::new(st.span(), "missing id field")
            .to_compile_error()
            .into();
    };
    if id_field.skip {
        return syn::Error::new(id_field.ident.span(), "the id field cannot be skipped")
            .to_compile_error()
            .into();
    }
    let id_column = &id_field.column;

    let mapped: Vec<_> = rest.iter().filter(|c| !c.skip).collect();
    let column_names: Vec<&String> = mapped.iter().map(|c| &c.column).collect();
    let value_exprs = mapped.iter().map(|c| {
        let ident = &c.ident;
        quote! { ::persistence_core::value::Value::from(::std::clone::Clone::clone(&self.#ident)) }
    });

    let row_fields = columns.iter().map(|c| {
        let ident = &c.ident;
        let ty = &c.ty;
        let column = &c.column;
        if c.skip {
            quote! { #ident: ::std::default::Default::default() }
        } else {
            quote! { #ident: row.try_get::<#ty, _>(#column)? }
        }
    });

    let mut required: Vec<syn::Path> =
        vec![syn::parse_quote!(Clone), syn::parse_quote!(Default)];
    if cfg.derive_debug.unwrap_or(true) {
        required.insert(0, syn::parse_quote!(Debug));
    }
    apply_derives(&mut st.attrs, required);

    let ident = &st.ident;
    let entity_name = ident.to_string();
    let generated = cfg.generated.unwrap_or(true);

    let expanded = quote! {
        #st

        impl ::persistence_core::persistable::Persistable for #ident {
            type Id = #id_type;

            const ENTITY: &'static str = #entity_name;
            const TABLE: &'static str = #table;
            const ID_COLUMN: &'static str = #id_column;
            const COLUMNS: &'static [&'static str] = &[#(#column_names),*];
            const ID_GENERATED: bool = #generated;

            fn id(&self) -> ::std::option::Option<&Self::Id> {
                self.id.as_ref()
            }

            fn set_id(&mut self, id: Self::Id) {
                self.id = ::std::option::Option::Some(id);
            }

            fn values(&self) -> ::std::vec::Vec<::persistence_core::value::Value> {
                ::std::vec![#(#value_exprs),*]
            }
        }

        impl<'r> ::persistence_core::sqlx::FromRow<'r, ::persistence_core::sqlx::any::AnyRow> for #ident {
            fn from_row(
                row: &'r ::persistence_core::sqlx::any::AnyRow,
            ) -> ::std::result::Result<Self, ::persistence_core::sqlx::Error> {
                use ::persistence_core::sqlx::Row as _;
                ::std::result::Result::Ok(Self {
                    #(#row_fields),*
                })
            }
        }
    };

    TokenStream::from(expanded)
}

// -------- parsing --------

#[derive(Default)]
struct EntityAttrConfig {
    table: Option<String>,
    id_ty: Option<Type>,
    generated: Option<bool>,
    derive_debug: Option<bool>,
}

impl Parse for EntityAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut cfg = EntityAttrConfig::default();
        if input.is_empty() {
            return Ok(cfg);
        }

        let elems: Punctuated<EntityAttrElem, Token![,]> =
            Punctuated::<EntityAttrElem, Token![,]>::parse_terminated(input)?;

        for elem in elems.into_iter() {
            match elem {
                EntityAttrElem::Table(lit) => {
                    if cfg.table.is_some() {
                        return Err(duplicate(lit.span(), "table"));
                    }
                    cfg.table = Some(lit.value());
                }
                EntityAttrElem::Id(ty) => {
                    if cfg.id_ty.is_some() {
                        return Err(duplicate(ty.span(), "id"));
                    }
                    cfg.id_ty = Some(*ty);
                }
                EntityAttrElem::Generated(span, b) => {
                    if cfg.generated.is_some() {
                        return Err(duplicate(span, "generated"));
                    }
                    cfg.generated = Some(b);
                }
                EntityAttrElem::Debug(span, b) => {
                    if cfg.derive_debug.is_some() {
                        return Err(duplicate(span, "debug"));
                    }
                    cfg.derive_debug = Some(b);
                }
            }
        }

        Ok(cfg)
    }
}

fn duplicate(span: proc_macro2::Span, key: &str) -> syn::Error {
    syn::Error::new(span, format!("duplicate key '{key}' in attribute"))
}

enum EntityAttrElem {
    Table(LitStr),
    Id(Box<Type>),
    Generated(proc_macro2::Span, bool),
    Debug(proc_macro2::Span, bool),
}

impl Parse for EntityAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        let _eq: Token![=] = input.parse()?;
        if key == "table" {
            Ok(EntityAttrElem::Table(input.parse()?))
        } else if key == "id" {
            Ok(EntityAttrElem::Id(Box::new(input.parse()?)))
        } else if key == "generated" {
            Ok(EntityAttrElem::Generated(key.span(), parse_bool(input, "generated")?))
        } else if key == "debug" {
            Ok(EntityAttrElem::Debug(key.span(), parse_bool(input, "debug")?))
        } else {
            Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'table', 'id', 'generated' or 'debug'",
            ))
        }
    }
}

fn parse_bool(input: ParseStream, key: &str) -> Result<bool> {
    let expr: syn::Expr = input.parse()?;
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Bool(b),
            ..
        }) => Ok(b.value()),
        other => Err(syn::Error::new(
            other.span(),
            format!("expected boolean literal for '{key}'"),
        )),
    }
}
