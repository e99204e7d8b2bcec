use syn::{GenericArgument, PathArguments, Type};

pub struct FieldData {
    pub ident: syn::Ident,
    pub name: String,
    pub ty: Type,
    pub is_option: bool,
    pub is_pk: bool,
    /// Integer primary keys are generated by the database (SERIAL / BIGSERIAL).
    pub is_generated: bool,
    pub sql_type: String,
    pub unique: bool,
    pub indexed: bool,
}

impl FieldData {
    pub fn column_definition(&self) -> String {
        let mut definition = format!("\"{}\" {}", self.name, self.sql_type);
        if self.is_pk {
            definition.push_str(" PRIMARY KEY");
        } else {
            if !self.is_option {
                definition.push_str(" NOT NULL");
            }
            if self.unique {
                definition.push_str(" UNIQUE");
            }
        }
        definition
    }
}

fn single_generic_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else { return None };
    let last_segment = type_path.path.segments.last()?;
    if last_segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(angle_args) = &last_segment.arguments else { return None };
    if angle_args.args.len() != 1 {
        return None;
    }
    match &angle_args.args[0] {
        GenericArgument::Type(inner_ty) => Some(inner_ty),
        _ => None,
    }
}

pub fn get_option_inner_type(ty: &Type) -> Option<&Type> {
    single_generic_argument(ty, "Option")
}

pub fn get_vec_inner_type(ty: &Type) -> Option<&Type> {
    single_generic_argument(ty, "Vec")
}

pub fn get_fully_qualified_type_string(ty: &Type) -> String {
    quote::quote!(#ty).to_string().replace(' ', "")
}

fn is_json_type(type_str: &str) -> bool {
    type_str.starts_with("Json<") || type_str.starts_with("::sqlx::types::Json<") || type_str.starts_with("sqlx::types::Json<")
}

fn map_scalar_type_to_sql(type_str: &str) -> Option<&'static str> {
    let sql = match type_str {
        "String" | "std::string::String" => "TEXT",
        "i16" => "SMALLINT",
        "i32" => "INTEGER",
        "i64" => "BIGINT",
        "f32" => "REAL",
        "f64" => "DOUBLE PRECISION",
        "bool" => "BOOLEAN",
        "Vec<u8>" => "BYTEA",
        "Uuid" | "::sqlx::types::Uuid" | "sqlx::types::Uuid" => "UUID",
        "NaiveDate" | "::chrono::NaiveDate" | "chrono::NaiveDate" => "DATE",
        "NaiveDateTime" | "::chrono::NaiveDateTime" | "chrono::NaiveDateTime" => "TIMESTAMP",
        "DateTime<Utc>" | "::chrono::DateTime<::chrono::Utc>" | "chrono::DateTime<chrono::Utc>" => "TIMESTAMPTZ",
        s if is_json_type(s) => "JSONB",
        _ => return None,
    };
    Some(sql)
}

/// Maps a (non-Option) Rust type to its PostgreSQL column type.
pub fn map_rust_type_to_sql(ty: &Type, generated_pk: bool) -> Result<String, String> {
    let type_str = get_fully_qualified_type_string(ty);

    if generated_pk {
        return match type_str.as_str() {
            "i32" => Ok("SERIAL".to_string()),
            "i64" => Ok("BIGSERIAL".to_string()),
            _ => Err(format!("generated primary keys must be i32 or i64, found '{}'", type_str)),
        };
    }

    if let Some(sql) = map_scalar_type_to_sql(&type_str) {
        return Ok(sql.to_string());
    }

    if let Some(inner_ty) = get_vec_inner_type(ty) {
        let inner_str = get_fully_qualified_type_string(inner_ty);
        return match map_scalar_type_to_sql(&inner_str) {
            Some(inner_sql) if inner_sql != "JSONB" && inner_sql != "BYTEA" => Ok(format!("{}[]", inner_sql)),
            _ => Err(format!("Vec<{}> cannot be mapped to an SQL array, wrap it in Json<..> instead", inner_str)),
        };
    }

    Err(format!("unsupported Rust type for SQL mapping: '{}'", type_str))
}
