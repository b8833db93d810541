use syn::spanned::Spanned;
use syn::{Field, FieldsNamed, LitStr, Type, Visibility};

/// 字段到列的映射
pub(crate) struct ColumnField {
    pub ident: syn::Ident,
    pub ty: Type,
    pub column: String,
    pub skip: bool,
}

/// 将 `id` 字段置于最前；缺失时以 `pub id: Option<IdType>` 新增
pub(crate) fn ensure_id_field(fields_named: &mut FieldsNamed, id_type: &Type) {
    let (ids, rest): (Vec<Field>, Vec<Field>) = std::mem::take(&mut fields_named.named)
        .into_iter()
        .partition(|f| f.ident.as_ref().is_some_and(|i| i == "id"));

    let id = match ids.into_iter().next() {
        Some(mut field) => {
            field.vis = Visibility::Public(Default::default());
            field
        }
        None => syn::parse_quote! { pub id: ::std::option::Option<#id_type> },
    };
    fields_named.named = std::iter::once(id).chain(rest).collect();
}

/// 读取并移除字段上的 `#[column(...)]` 属性
pub(crate) fn take_columns(fields_named: &mut FieldsNamed) -> syn::Result<Vec<ColumnField>> {
    let mut out = Vec::with_capacity(fields_named.named.len());
    for field in fields_named.named.iter_mut() {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "field must be named"))?;
        let mut column = ident.to_string();
        let mut skip = false;

        let mut retained = Vec::with_capacity(field.attrs.len());
        for attr in field.attrs.drain(..) {
            if !attr.path().is_ident("column") {
                retained.push(attr);
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    column = lit.value();
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    skip = true;
                    Ok(())
                } else {
                    Err(meta.error("unknown column option; expected 'name' or 'skip'"))
                }
            })?;
        }
        field.attrs = retained;

        out.push(ColumnField {
            ident,
            ty: field.ty.clone(),
            column,
            skip,
        });
    }
    Ok(out)
}
