use sqlx::{postgres::PgArguments, Arguments, Error as SqlxError, Executor, FromRow, Postgres};

/// Trait to define the schema of a database object for PostgreSQL.
pub trait SqlxSchema: Send + Sync + Unpin + Clone + std::fmt::Debug {
    /// The type of the primary key for this database object.
    type Id: Send + Sync + for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Clone + 'static;

    /// The intermediate type that implements FromRow, used for fetching from the database.
    type Row: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin;

    const TABLE_NAME: &'static str;
    const ID_COLUMN_NAME: &'static str;
    const COLUMNS: &'static [&'static str];
    const INDEXES_SQL: &'static [&'static str];

    fn id_column_name() -> &'static str { Self::ID_COLUMN_NAME }
    fn table_name() -> &'static str { Self::TABLE_NAME }
    fn columns() -> &'static [&'static str] { Self::COLUMNS }

    /// Retrieves the value of the primary key for an instance of the object.
    fn get_id_value(&self) -> Self::Id;

    /// Converts the intermediate Row type to the Self type.
    fn from_row(row: Self::Row) -> Self;

    // SQL generation methods, implemented by the derive macro
    fn create_table_sql() -> String;
    fn drop_table_sql() -> String;
    fn insert_sql() -> String;
    fn update_sql() -> String;
}

/// Create, update and delete for a single record.
#[async_trait::async_trait]
pub trait SqlxCrud: SqlxSchema + SqlxFilterQuery + Sized {
    /// Binds the struct fields to an insert query.
    fn bind_insert<'q>(&self, query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>)
        -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>;

    /// Binds the struct fields to an update query. The id is bound last.
    fn bind_update<'q>(&self, query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>)
        -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>;

    /// Inserts the record and returns it as stored, with generated columns filled in.
    async fn create<'e, E>(self, executor: E) -> Result<Self, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send;

    /// Updates the record identified by its primary key.
    async fn update<'e, E>(self, executor: E) -> Result<Self, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send;

    /// Deletes the record by its primary key and returns the number of affected rows.
    async fn delete<'e, E>(self, executor: E) -> Result<u64, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send;
}

/// Specifies the direction for ordering query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for OrderDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(OrderDirection::Asc),
            "desc" => Ok(OrderDirection::Desc),
            other => Err(format!("unknown order direction '{}', expected asc or desc", other)),
        }
    }
}

/// Anything that can be pushed onto a `PgArguments` list.
/// Lets `QueryCriteria` hold values of different types.
pub trait AsSqlxArg: Send + Sync {
    fn add_to_args(&self, args: &mut PgArguments) -> Result<(), SqlxError>;
}

impl<T> AsSqlxArg for T
where
    T: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
{
    fn add_to_args(&self, args: &mut PgArguments) -> Result<(), SqlxError> {
        args.add(self.clone()).map_err(SqlxError::Encode)
    }
}

/// A single `"column" <operator> $n` condition.
///
/// When the operator contains `{}` the placeholder is substituted there
/// (e.g. `"= ANY({})"`), otherwise it is appended.
pub struct FilterCondition {
    pub column: &'static str,
    pub operator: &'static str,
    pub value: Option<Box<dyn AsSqlxArg>>,
}

/// `("a" <op> $n OR "b" <op> $n)`, with one value shared by every column.
pub struct AnyOfCondition {
    pub columns: Vec<&'static str>,
    pub operator: &'static str,
    pub value: Box<dyn AsSqlxArg>,
}

fn render_condition(column: &str, operator: &str, placeholder: Option<usize>) -> String {
    match placeholder {
        Some(idx) if operator.contains("{}") => {
            format!("\"{}\" {}", column, operator.replace("{}", &format!("${}", idx)))
        }
        Some(idx) => format!("\"{}\" {} ${}", column, operator, idx),
        None => format!("\"{}\" {}", column, operator),
    }
}

/// The complete criteria for a filtered query. Conditions are joined with AND.
#[derive(Default)]
pub struct QueryCriteria {
    pub conditions: Vec<FilterCondition>,
    pub any_of: Vec<AnyOfCondition>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order_by: Vec<(&'static str, OrderDirection)>,
}

impl QueryCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter condition that may or may not carry a value.
    pub fn add_filter<V>(mut self, column: &'static str, operator: &'static str, value: Option<V>) -> Self
    where
        V: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.conditions.push(FilterCondition {
            column,
            operator,
            value: value.map(|v| Box::new(v) as Box<dyn AsSqlxArg>),
        });
        self
    }

    pub fn add_valued_filter<V>(self, column: &'static str, operator: &'static str, value: V) -> Self
    where
        V: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.add_filter(column, operator, Some(value))
    }

    /// Matches when any of `columns` satisfies `operator` against `value`.
    pub fn add_any_of_filter<V>(mut self, columns: &[&'static str], operator: &'static str, value: V) -> Self
    where
        V: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.any_of.push(AnyOfCondition {
            columns: columns.to_vec(),
            operator,
            value: Box::new(value),
        });
        self
    }

    pub fn limit(mut self, limit_val: i64) -> Self {
        self.limit = Some(limit_val);
        self
    }

    pub fn offset(mut self, offset_val: i64) -> Self {
        self.offset = Some(offset_val);
        self
    }

    pub fn order_by(mut self, column: &'static str, direction: OrderDirection) -> Self {
        self.order_by.push((column, direction));
        self
    }

    /// Renders the WHERE clause (without the keyword) and pushes its arguments.
    /// `placeholder_idx` is the next free `$n` and is advanced past every bound value.
    pub fn where_sql(&self, arguments: &mut PgArguments, placeholder_idx: &mut usize) -> Result<Option<String>, SqlxError> {
        let mut clauses = Vec::new();

        for condition in &self.conditions {
            let placeholder = match &condition.value {
                Some(value) => {
                    value.add_to_args(arguments)?;
                    let idx = *placeholder_idx;
                    *placeholder_idx += 1;
                    Some(idx)
                }
                None => None,
            };
            clauses.push(render_condition(condition.column, condition.operator, placeholder));
        }

        for group in &self.any_of {
            group.value.add_to_args(arguments)?;
            let idx = *placeholder_idx;
            *placeholder_idx += 1;

            let alternatives = group.columns.iter()
                .map(|column| render_condition(column, group.operator, Some(idx)))
                .collect::<Vec<_>>();
            clauses.push(format!("({})", alternatives.join(" OR ")));
        }

        if clauses.is_empty() {
            Ok(None)
        } else {
            Ok(Some(clauses.join(" AND ")))
        }
    }

    /// Renders ORDER BY / LIMIT / OFFSET and pushes their arguments.
    pub fn tail_sql(&self, arguments: &mut PgArguments, placeholder_idx: &mut usize) -> Result<String, SqlxError> {
        let mut parts = Vec::new();

        if !self.order_by.is_empty() {
            let order_clauses = self.order_by.iter()
                .map(|(col, dir)| format!("\"{}\" {}", col, dir.as_sql()))
                .collect::<Vec<_>>();
            parts.push(format!("ORDER BY {}", order_clauses.join(", ")));
        }

        if let Some(limit_val) = self.limit {
            arguments.add(limit_val).map_err(SqlxError::Encode)?;
            parts.push(format!("LIMIT ${}", placeholder_idx));
            *placeholder_idx += 1;
        }

        if let Some(offset_val) = self.offset {
            arguments.add(offset_val).map_err(SqlxError::Encode)?;
            parts.push(format!("OFFSET ${}", placeholder_idx));
            *placeholder_idx += 1;
        }

        Ok(parts.join(" "))
    }
}

/// Trait for finding records based on dynamic filter criteria.
#[async_trait::async_trait]
pub trait SqlxFilterQuery: SqlxSchema + Sized {
    /// Finds records based on the provided criteria.
    async fn find_by_criteria<'e, E>(
        criteria: QueryCriteria,
        executor: E,
    ) -> Result<Vec<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send;

    /// Counts records matching the criteria. Ordering and paging are ignored.
    async fn count_by_criteria<'e, E>(
        criteria: QueryCriteria,
        executor: E,
    ) -> Result<i64, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send;

    /// Deletes records based on the provided criteria.
    async fn delete_by_criteria<'e, E>(
        criteria: QueryCriteria,
        executor: E,
    ) -> Result<u64, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send;

    /// Finds a single optional record. Adds LIMIT 1 when no limit was given.
    async fn find_one_by_criteria<'e, E>(
        mut criteria: QueryCriteria,
        executor: E,
    ) -> Result<Option<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send
    {
        if criteria.limit.is_none() {
            criteria = criteria.limit(1);
        }
        let mut results = Self::find_by_criteria(criteria, executor).await?;
        Ok(results.pop())
    }

    async fn find_by_id<'e, E>(
        id: Self::Id,
        executor: E,
    ) -> Result<Option<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send
    {
        let criteria = QueryCriteria::new()
            .add_valued_filter(Self::ID_COLUMN_NAME, "=", id);
        Self::find_one_by_criteria(criteria, executor).await
    }
}
