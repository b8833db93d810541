use quote::ToTokens;
use syn::punctuated::Punctuated;
use syn::{Attribute, Path, Token};

/// 把宏要求的 derive 与用户已写的 derive 合并为一个 `#[derive(..)]`
///
/// 宏要求的条目排在前面；同名条目只保留一次，`serde::Serialize` 与
/// `Serialize` 视为同一项。无法解析的 derive 属性原样丢弃。
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<Path>) {
    let mut user_derives = Vec::new();
    attrs.retain(|attr| {
        if !attr.path().is_ident("derive") {
            return true;
        }
        if let Ok(list) = attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated) {
            user_derives.extend(list);
        }
        false
    });

    let mut keys = std::collections::HashSet::new();
    let derives: Vec<Path> = required
        .into_iter()
        .chain(user_derives)
        .filter(|path| keys.insert(derive_name(path)))
        .collect();
    attrs.insert(0, syn::parse_quote!(#[derive(#(#derives),*)]));
}

fn derive_name(path: &Path) -> String {
    let Some(last) = path.segments.last() else {
        return path.to_token_stream().to_string();
    };
    match last.ident.to_string() {
        name if name == "Serialize" || name == "Deserialize" => format!("serde::{name}"),
        name => name,
    }
}
