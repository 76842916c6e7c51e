use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Arguments, Error as SqlxError, Executor, FromRow, Postgres};

/// Trait to define the schema of a database object for PostgreSQL.
///
/// Rows are decoded straight into the implementing type through `FromRow`,
/// so `COLUMNS` must match the fields the type reads.
pub trait SqlxSchema: for<'r> FromRow<'r, PgRow> + Send + Unpin + Sized {
    const TABLE_NAME: &'static str;
    const ID_COLUMN_NAME: &'static str = "id";
    const COLUMNS: &'static [&'static str];
    const INDEXES_SQL: &'static [&'static str] = &[];

    /// Idempotent DDL for the table (`CREATE TABLE IF NOT EXISTS ...`).
    fn create_table_sql() -> String;

    /// Example: "SELECT id, slug, title FROM topics"
    fn select_all_sql() -> String {
        format!("SELECT {} FROM {}", Self::COLUMNS.join(", "), Self::TABLE_NAME)
    }

    /// Example: "SELECT id, slug, title FROM topics WHERE id = $1"
    fn select_by_id_sql() -> String {
        format!("{} WHERE {} = $1", Self::select_all_sql(), Self::ID_COLUMN_NAME)
    }
}

/// Read access by primary key. Writes are entity specific and live next to
/// the entity, since every table here maintains its own counters.
#[async_trait::async_trait]
pub trait SqlxCrud: SqlxSchema {
    async fn find_by_id<'e, E>(id: i64, executor: E) -> Result<Option<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let sql = Self::select_by_id_sql();
        sqlx::query_as::<_, Self>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }
}

impl<T: SqlxSchema> SqlxCrud for T {}

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

/// A value that can be appended to a Postgres argument list, boxed so that
/// one criteria can carry binds of different types.
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

/// Represents a single filter condition for a database query.
pub struct FilterCondition {
    pub column: &'static str,
    pub operator: &'static str,
    /// Holds the value for the condition's placeholder, if any.
    pub value: Option<Box<dyn AsSqlxArg>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Column(&'static str, OrderDirection),
    Random,
}

/// The `WHERE`, `ORDER BY` and `LIMIT` tail of a select, with positional binds.
#[derive(Default)]
pub struct QueryCriteria {
    pub conditions: Vec<FilterCondition>,
    pub order_by: Vec<Ordering>,
    pub limit: Option<i64>,
}

impl QueryCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter condition that may or may not have a value.
    /// `add_filter::<bool>("edited_date", "IS NULL", None)` renders without a bind.
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

    pub fn order_by(mut self, column: &'static str, direction: OrderDirection) -> Self {
        self.order_by.push(Ordering::Column(column, direction));
        self
    }

    pub fn order_by_random(mut self) -> Self {
        self.order_by.push(Ordering::Random);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Appends the criteria to `base`, numbering placeholders from `$1`.
    pub fn render(&self, base: &str) -> String {
        let mut sql = base.to_string();
        let mut placeholder = 0;

        for (i, condition) in self.conditions.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            sql.push_str(condition.column);
            sql.push(' ');
            sql.push_str(condition.operator);
            if condition.value.is_some() {
                placeholder += 1;
                sql.push_str(&format!(" ${placeholder}"));
            }
        }

        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|ordering| match ordering {
                    Ordering::Column(column, direction) => format!("{column} {}", direction.as_sql()),
                    Ordering::Random => "random()".to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        sql
    }

    pub fn arguments(&self) -> Result<PgArguments, SqlxError> {
        let mut args = PgArguments::default();
        for value in self.conditions.iter().filter_map(|c| c.value.as_ref()) {
            value.add_to_args(&mut args)?;
        }
        Ok(args)
    }
}

/// Trait for finding records based on dynamic filter criteria.
#[async_trait::async_trait]
pub trait SqlxFilterQuery: SqlxSchema {
    async fn find_by_criteria<'e, E>(
        criteria: QueryCriteria,
        executor: E,
    ) -> Result<Vec<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let sql = criteria.render(&Self::select_all_sql());
        let args = criteria.arguments()?;
        sqlx::query_as_with::<_, Self, _>(&sql, args)
            .fetch_all(executor)
            .await
    }

    /// Finds a single optional record. Adds `LIMIT 1` when the criteria has no limit.
    async fn find_one_by_criteria<'e, E>(
        mut criteria: QueryCriteria,
        executor: E,
    ) -> Result<Option<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        if criteria.limit.is_none() {
            criteria = criteria.limit(1);
        }
        let mut results = Self::find_by_criteria(criteria, executor).await?;
        Ok(results.pop())
    }
}

impl<T: SqlxSchema> SqlxFilterQuery for T {}
