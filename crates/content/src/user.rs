use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};

use thebestory_database::SqlxSchema;

/// Reserved account that owns every unauthenticated submission and like.
pub const ANONYMOUS_USER_ID: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,

    pub stories_count: i32,
    pub comments_count: i32,
    pub story_likes_count: i32,
    pub comment_likes_count: i32,
}

impl SqlxSchema for User {
    const TABLE_NAME: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "username",
        "stories_count",
        "comments_count",
        "story_likes_count",
        "comment_likes_count",
    ];

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            username VARCHAR(32) NOT NULL UNIQUE,
            stories_count INTEGER NOT NULL DEFAULT 0,
            comments_count INTEGER NOT NULL DEFAULT 0,
            story_likes_count INTEGER NOT NULL DEFAULT 0,
            comment_likes_count INTEGER NOT NULL DEFAULT 0
        )
        "#
        .to_string()
    }
}

impl User {
    /// Inserts the user with a fixed id unless a row with that id exists.
    pub async fn ensure_exists<'e, E>(id: i64, username: &str, executor: E) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO users (id, username) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
            .bind(id)
            .bind(username)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn increment_stories_count<'e, E>(id: i64, executor: E) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET stories_count = stories_count + 1 WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn increment_comments_count<'e, E>(id: i64, executor: E) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET comments_count = comments_count + 1 WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn adjust_story_likes_count<'e, E>(id: i64, delta: i32, executor: E) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET story_likes_count = story_likes_count + $2 WHERE id = $1")
            .bind(id)
            .bind(delta)
            .execute(executor)
            .await?;
        Ok(())
    }
}
