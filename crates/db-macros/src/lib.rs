use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DataStruct, DeriveInput, Fields};

mod internals {
    pub mod codegen;
    pub mod parse;
    pub mod types;
}

use internals::codegen::{
    generate_row_struct, generate_sqlx_crud_impl, generate_sqlx_filter_query_impl, generate_sqlx_schema_impl,
};
use internals::parse::{get_fields_data, parse_table_name};

/// Derives `SqlxSchema`, `SqlxCrud` and `SqlxFilterQuery` for a struct with named fields.
///
/// The struct must carry `#[table_name = "..."]` and an `id` field. An `i32`/`i64` id
/// becomes a SERIAL/BIGSERIAL column and is left out of inserts.
///
/// Field attributes:
/// - `#[unique]` adds a UNIQUE constraint.
/// - `#[indexed]` creates a btree index on the column.
#[proc_macro_derive(SqlxObject, attributes(table_name, unique, indexed))]
pub fn sqlx_object_derive(input: TokenStream) -> TokenStream {
    let input_ast = parse_macro_input!(input as DeriveInput);
    match expand_sqlx_object(&input_ast) {
        Ok(expanded) => expanded.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_sqlx_object(input_ast: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input_ast.ident;
    let row_struct_name = format_ident!("{}RowSqlx", struct_name);

    let Data::Struct(DataStruct { fields: Fields::Named(named_fields), .. }) = &input_ast.data else {
        return Err(syn::Error::new_spanned(struct_name, "SqlxObject can only be derived for structs with named fields"));
    };

    let table_name = parse_table_name(input_ast)?;
    let fields_data = get_fields_data(&named_fields.named)?;

    let row_struct = generate_row_struct(&row_struct_name, &fields_data);
    let schema_impl = generate_sqlx_schema_impl(struct_name, &row_struct_name, &table_name, &fields_data);
    let crud_impl = generate_sqlx_crud_impl(struct_name, &table_name, &fields_data);
    let filter_impl = generate_sqlx_filter_query_impl(struct_name, &row_struct_name, &table_name, &fields_data);

    Ok(quote! {
        #row_struct
        #schema_impl
        #crud_impl
        #filter_impl
    })
}
