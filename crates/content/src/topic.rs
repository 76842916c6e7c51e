use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};

use thebestory_database::SqlxSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Topic {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub stories_count: i32,
}

impl SqlxSchema for Topic {
    const TABLE_NAME: &'static str = "topics";
    const COLUMNS: &'static [&'static str] =
        &["id", "slug", "title", "description", "icon", "stories_count"];

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS topics (
            id BIGSERIAL PRIMARY KEY,
            slug VARCHAR(32) NOT NULL UNIQUE,
            title VARCHAR(64) NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            icon TEXT NOT NULL DEFAULT '',
            stories_count INTEGER NOT NULL DEFAULT 0
        )
        "#
        .to_string()
    }
}

impl Topic {
    pub async fn create<'e, E>(
        slug: &str,
        title: &str,
        description: &str,
        icon: &str,
        executor: E,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO topics (slug, title, description, icon) VALUES ($1, $2, $3, $4) RETURNING {}",
            Self::COLUMNS.join(", ")
        );
        sqlx::query_as::<_, Self>(&sql)
            .bind(slug)
            .bind(title)
            .bind(description)
            .bind(icon)
            .fetch_one(executor)
            .await
    }

    /// Bumps the story counter and returns the refreshed row, or `None` if
    /// the topic does not exist.
    pub async fn increment_stories_count<'e, E>(id: i64, executor: E) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE topics SET stories_count = stories_count + 1 WHERE id = $1 RETURNING {}",
            Self::COLUMNS.join(", ")
        );
        sqlx::query_as::<_, Self>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }
}

/// A topic as embedded in a story. Feeds only carry the id; the stub is also
/// used when the topic row has gone missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TopicView {
    Full(Topic),
    Stub { id: i64 },
}

impl TopicView {
    pub fn stub(id: i64) -> Self {
        TopicView::Stub { id }
    }
}

impl From<Topic> for TopicView {
    fn from(topic: Topic) -> Self {
        TopicView::Full(topic)
    }
}
