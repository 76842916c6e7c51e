use anyhow::Result;

use thebestory_common::ModuleClient;
use thebestory_content::{init_schema, Listing, User};
use thebestory_database::PostgresClient;

use crate::ApiServerEnv;

#[derive(Clone)]
pub struct GlobalState {
    pub db: PostgresClient,
    pub listing: Listing,
    pub anonymous_user_id: i64,
}

impl GlobalState {
    pub async fn new(env: &ApiServerEnv) -> Result<Self> {
        let db = PostgresClient::setup_connection().await?;

        if env.create_tables {
            init_schema(db.get_client()).await?;
            tracing::info!("database schema is in place");
        }
        User::ensure_exists(env.anonymous_user_id, "anonymous", db.get_client()).await?;

        Ok(Self::from_parts(db, env.listing, env.anonymous_user_id))
    }

    pub fn from_parts(db: PostgresClient, listing: Listing, anonymous_user_id: i64) -> Self {
        Self { db, listing, anonymous_user_id }
    }
}
