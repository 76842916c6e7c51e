use anyhow::{bail, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use thebestory_common::{EnvVars, ModuleClient};

use crate::DatabaseEnv;

/// Generates `init_schema(pool)` for the listed entity types.
///
/// Tables are created in the order given, so referenced tables must come
/// before the tables that reference them.
///
/// ```rust,ignore
/// init_databases!(Topic, User, Story);
///
/// init_schema(&pool).await?;
/// ```
#[macro_export]
macro_rules! init_databases {
    ($($entity:ty),* $(,)?) => {
        pub async fn init_schema(pool: &::sqlx::PgPool) -> ::std::result::Result<(), ::sqlx::Error> {
            use $crate::SqlxSchema;

            $(
                ::sqlx::query(&<$entity as SqlxSchema>::create_table_sql())
                    .execute(pool)
                    .await?;

                for index_sql in <$entity as SqlxSchema>::INDEXES_SQL {
                    ::sqlx::query(index_sql).execute(pool).await?;
                }
            )*

            Ok(())
        }
    };
}

/// Connection pool handle shared by every request.
#[derive(Clone)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    pub async fn connect(env: &DatabaseEnv) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(env.max_connections)
            .connect(&env.database_url)
            .await?;

        tracing::info!("[Client: {}] connected, max_connections={}", Self::NAME, env.max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ModuleClient for PostgresClient {
    const NAME: &'static str = "postgres";
    const ENV_VARS: &'static [&'static str] = &["DATABASE_URL"];
    type Client = PgPool;

    async fn setup_connection() -> Result<Self> {
        if !Self::validate_env() {
            bail!("[Client: {}] Required environment variables are not set", Self::NAME);
        }

        Self::connect(&DatabaseEnv::load()?).await
    }

    fn get_client(&self) -> &PgPool {
        &self.pool
    }
}
