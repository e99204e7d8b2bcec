use syn::{DeriveInput, Expr, ExprLit, Field, Lit, Meta};

use super::types::{get_option_inner_type, map_rust_type_to_sql, FieldData};

pub fn parse_table_name(input: &DeriveInput) -> syn::Result<String> {
    for attr in &input.attrs {
        if !attr.path().is_ident("table_name") {
            continue;
        }
        if let Meta::NameValue(mnv) = &attr.meta {
            if let Expr::Lit(ExprLit { lit: Lit::Str(lit_str), .. }) = &mnv.value {
                return Ok(lit_str.value());
            }
        }
        return Err(syn::Error::new_spanned(
            attr,
            "table_name attribute must be a name-value pair like #[table_name = \"my_table\"]",
        ));
    }
    Err(syn::Error::new_spanned(
        &input.ident,
        "SqlxObject requires a #[table_name = \"...\"] attribute",
    ))
}

fn has_attr(field: &Field, name: &str) -> bool {
    field.attrs.iter().any(|attr| attr.path().is_ident(name))
}

/// Gathers all relevant data from the struct's fields.
pub fn get_fields_data(
    fields: &syn::punctuated::Punctuated<Field, syn::Token![,]>,
) -> syn::Result<Vec<FieldData>> {
    let mut fields_data = Vec::with_capacity(fields.len());

    for field in fields {
        let Some(field_ident) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "SqlxObject fields must be named"));
        };
        let field_ty = &field.ty;
        let inner_ty = get_option_inner_type(field_ty);
        let is_option = inner_ty.is_some();
        let is_pk = field_ident == "id";

        if is_pk && is_option {
            return Err(syn::Error::new_spanned(field_ty, "the `id` column cannot be optional"));
        }

        let type_for_sql = inner_ty.unwrap_or(field_ty);
        let is_generated = is_pk && matches!(
            super::types::get_fully_qualified_type_string(type_for_sql).as_str(),
            "i32" | "i64"
        );
        let sql_type = map_rust_type_to_sql(type_for_sql, is_generated)
            .map_err(|message| syn::Error::new_spanned(field_ty, message))?;

        fields_data.push(FieldData {
            name: field_ident.to_string(),
            ident: field_ident,
            ty: field_ty.clone(),
            is_option,
            is_pk,
            is_generated,
            sql_type,
            unique: has_attr(field, "unique"),
            indexed: has_attr(field, "indexed"),
        });
    }

    if !fields_data.iter().any(|f| f.is_pk) {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "SqlxObject requires an `id` field as primary key",
        ));
    }

    Ok(fields_data)
}
