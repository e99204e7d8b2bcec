use proc_macro2::TokenStream;
use quote::quote;
use syn::{Ident, LitStr};

use super::types::FieldData;

fn quoted_columns(fields: &[&FieldData]) -> String {
    fields.iter()
        .map(|f| format!("\"{}\"", f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn lit(value: &str) -> LitStr {
    LitStr::new(value, proc_macro2::Span::call_site())
}

/// Returns the CREATE TABLE statement and the CREATE INDEX statements of the table.
pub fn generate_create_table_sql(table_name: &str, fields_data: &[FieldData]) -> (String, Vec<String>) {
    let column_definitions = fields_data.iter()
        .map(FieldData::column_definition)
        .collect::<Vec<_>>();

    let create_table_sql = format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n)",
        table_name,
        column_definitions.join(",\n    ")
    );

    // UNIQUE columns already carry an implicit index
    let index_sqls = fields_data.iter()
        .filter(|f| f.indexed && !f.unique && !f.is_pk)
        .map(|f| format!(
            "CREATE INDEX IF NOT EXISTS \"idx_{table}_{col}\" ON \"{table}\" (\"{col}\")",
            table = table_name,
            col = f.name
        ))
        .collect();

    (create_table_sql, index_sqls)
}

pub fn generate_row_struct(row_struct_name: &Ident, fields_data: &[FieldData]) -> TokenStream {
    let row_fields = fields_data.iter().map(|field| {
        let ident = &field.ident;
        let ty = &field.ty;
        quote! { pub #ident: #ty }
    });

    quote! {
        #[derive(::sqlx::FromRow, Debug, Clone)]
        pub struct #row_struct_name {
            #(#row_fields),*
        }
    }
}

pub fn generate_sqlx_schema_impl(
    struct_name: &Ident,
    row_struct_name: &Ident,
    table_name: &str,
    fields_data: &[FieldData],
) -> TokenStream {
    let all_fields: Vec<&FieldData> = fields_data.iter().collect();
    let select_columns = quoted_columns(&all_fields);

    let column_name_lits: Vec<LitStr> = fields_data.iter().map(|f| lit(&f.name)).collect();
    let field_idents: Vec<&Ident> = fields_data.iter().map(|f| &f.ident).collect();

    let (create_table_sql, index_sqls) = generate_create_table_sql(table_name, fields_data);
    let index_sql_lits: Vec<LitStr> = index_sqls.iter().map(|s| lit(s)).collect();
    let drop_table_sql = format!("DROP TABLE IF EXISTS \"{}\" CASCADE", table_name);

    let insert_fields: Vec<&FieldData> = fields_data.iter().filter(|f| !f.is_generated).collect();
    let insert_placeholders = (1..=insert_fields.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let insert_sql = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING {}",
        table_name, quoted_columns(&insert_fields), insert_placeholders, select_columns
    );

    let update_fields: Vec<&FieldData> = fields_data.iter().filter(|f| !f.is_pk).collect();
    let set_clauses = update_fields.iter()
        .enumerate()
        .map(|(i, f)| format!("\"{}\" = ${}", f.name, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let update_sql = format!(
        "UPDATE \"{}\" SET {} WHERE \"id\" = ${} RETURNING {}",
        table_name, set_clauses, update_fields.len() + 1, select_columns
    );

    let pk_ty = fields_data.iter()
        .find(|f| f.is_pk)
        .map(|f| f.ty.clone())
        .expect("primary key presence is checked while parsing");

    quote! {
        #[automatically_derived]
        impl ::paperhub_database::SqlxSchema for #struct_name {
            type Id = #pk_ty;
            type Row = #row_struct_name;

            const TABLE_NAME: &'static str = #table_name;
            const ID_COLUMN_NAME: &'static str = "id";
            const COLUMNS: &'static [&'static str] = &[#( #column_name_lits ),*];
            const INDEXES_SQL: &'static [&'static str] = &[#( #index_sql_lits ),*];

            fn get_id_value(&self) -> Self::Id { self.id.clone() }

            fn from_row(row: Self::Row) -> Self {
                Self {
                    #( #field_idents: row.#field_idents ),*
                }
            }

            fn create_table_sql() -> String { #create_table_sql.to_string() }
            fn drop_table_sql() -> String { #drop_table_sql.to_string() }
            fn insert_sql() -> String { #insert_sql.to_string() }
            fn update_sql() -> String { #update_sql.to_string() }
        }
    }
}

pub fn generate_sqlx_crud_impl(struct_name: &Ident, table_name: &str, fields_data: &[FieldData]) -> TokenStream {
    let insert_idents: Vec<&Ident> = fields_data.iter()
        .filter(|f| !f.is_generated)
        .map(|f| &f.ident)
        .collect();
    let update_idents: Vec<&Ident> = fields_data.iter()
        .filter(|f| !f.is_pk)
        .map(|f| &f.ident)
        .collect();
    let delete_sql = format!("DELETE FROM \"{}\" WHERE \"id\" = $1", table_name);

    quote! {
        #[automatically_derived]
        #[::async_trait::async_trait]
        impl ::paperhub_database::SqlxCrud for #struct_name {
            fn bind_insert<'q>(
                &self,
                query: ::sqlx::query::QueryAs<'q, ::sqlx::Postgres, <Self as ::paperhub_database::SqlxSchema>::Row, ::sqlx::postgres::PgArguments>
            ) -> ::sqlx::query::QueryAs<'q, ::sqlx::Postgres, <Self as ::paperhub_database::SqlxSchema>::Row, ::sqlx::postgres::PgArguments> {
                query #( .bind(self.#insert_idents.clone()) )*
            }

            fn bind_update<'q>(
                &self,
                query: ::sqlx::query::QueryAs<'q, ::sqlx::Postgres, <Self as ::paperhub_database::SqlxSchema>::Row, ::sqlx::postgres::PgArguments>
            ) -> ::sqlx::query::QueryAs<'q, ::sqlx::Postgres, <Self as ::paperhub_database::SqlxSchema>::Row, ::sqlx::postgres::PgArguments> {
                query #( .bind(self.#update_idents.clone()) )* .bind(self.id.clone())
            }

            async fn create<'e, E>(self, executor: E) -> Result<Self, ::sqlx::Error>
            where
                E: ::sqlx::Executor<'e, Database = ::sqlx::Postgres> + Send,
                Self: Send
            {
                let sql = <Self as ::paperhub_database::SqlxSchema>::insert_sql();
                self.bind_insert(::sqlx::query_as::<_, <Self as ::paperhub_database::SqlxSchema>::Row>(&sql))
                    .fetch_one(executor)
                    .await
                    .map(<Self as ::paperhub_database::SqlxSchema>::from_row)
            }

            async fn update<'e, E>(self, executor: E) -> Result<Self, ::sqlx::Error>
            where
                E: ::sqlx::Executor<'e, Database = ::sqlx::Postgres> + Send,
                Self: Send
            {
                let sql = <Self as ::paperhub_database::SqlxSchema>::update_sql();
                self.bind_update(::sqlx::query_as::<_, <Self as ::paperhub_database::SqlxSchema>::Row>(&sql))
                    .fetch_one(executor)
                    .await
                    .map(<Self as ::paperhub_database::SqlxSchema>::from_row)
            }

            async fn delete<'e, E>(self, executor: E) -> Result<u64, ::sqlx::Error>
            where
                E: ::sqlx::Executor<'e, Database = ::sqlx::Postgres> + Send,
                Self: Send
            {
                ::sqlx::query(#delete_sql)
                    .bind(self.id.clone())
                    .execute(executor)
                    .await
                    .map(|done| done.rows_affected())
            }
        }
    }
}

pub fn generate_sqlx_filter_query_impl(
    struct_name: &Ident,
    row_struct_name: &Ident,
    table_name: &str,
    fields_data: &[FieldData],
) -> TokenStream {
    let all_fields: Vec<&FieldData> = fields_data.iter().collect();
    let select_sql = format!("SELECT {} FROM \"{}\"", quoted_columns(&all_fields), table_name);
    let count_sql = format!("SELECT COUNT(*) FROM \"{}\"", table_name);
    let delete_sql = format!("DELETE FROM \"{}\"", table_name);

    quote! {
        #[automatically_derived]
        #[::async_trait::async_trait]
        impl ::paperhub_database::SqlxFilterQuery for #struct_name {
            async fn find_by_criteria<'exe, E>(
                criteria: ::paperhub_database::QueryCriteria,
                executor: E,
            ) -> Result<Vec<Self>, ::sqlx::Error>
            where
                E: ::sqlx::Executor<'exe, Database = ::sqlx::Postgres> + Send,
                Self: Send,
            {
                let mut arguments = ::sqlx::postgres::PgArguments::default();
                let mut placeholder_idx: usize = 1;
                let mut sql = String::from(#select_sql);

                if let Some(where_sql) = criteria.where_sql(&mut arguments, &mut placeholder_idx)? {
                    sql.push_str(" WHERE ");
                    sql.push_str(&where_sql);
                }
                let tail_sql = criteria.tail_sql(&mut arguments, &mut placeholder_idx)?;
                if !tail_sql.is_empty() {
                    sql.push(' ');
                    sql.push_str(&tail_sql);
                }

                ::sqlx::query_as_with::<_, #row_struct_name, _>(&sql, arguments)
                    .fetch_all(executor)
                    .await
                    .map(|rows| rows.into_iter().map(<Self as ::paperhub_database::SqlxSchema>::from_row).collect())
            }

            async fn count_by_criteria<'exe, E>(
                criteria: ::paperhub_database::QueryCriteria,
                executor: E,
            ) -> Result<i64, ::sqlx::Error>
            where
                E: ::sqlx::Executor<'exe, Database = ::sqlx::Postgres> + Send,
                Self: Send,
            {
                let mut arguments = ::sqlx::postgres::PgArguments::default();
                let mut placeholder_idx: usize = 1;
                let mut sql = String::from(#count_sql);

                if let Some(where_sql) = criteria.where_sql(&mut arguments, &mut placeholder_idx)? {
                    sql.push_str(" WHERE ");
                    sql.push_str(&where_sql);
                }

                ::sqlx::query_scalar_with::<_, i64, _>(&sql, arguments)
                    .fetch_one(executor)
                    .await
            }

            async fn delete_by_criteria<'exe, E>(
                criteria: ::paperhub_database::QueryCriteria,
                executor: E,
            ) -> Result<u64, ::sqlx::Error>
            where
                E: ::sqlx::Executor<'exe, Database = ::sqlx::Postgres> + Send,
                Self: Send,
            {
                let mut arguments = ::sqlx::postgres::PgArguments::default();
                let mut placeholder_idx: usize = 1;
                let mut sql = String::from(#delete_sql);

                if let Some(where_sql) = criteria.where_sql(&mut arguments, &mut placeholder_idx)? {
                    sql.push_str(" WHERE ");
                    sql.push_str(&where_sql);
                }

                ::sqlx::query_with(&sql, arguments)
                    .execute(executor)
                    .await
                    .map(|done| done.rows_affected())
            }
        }
    }
}
