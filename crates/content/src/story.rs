use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, PgPool, Postgres};

use thebestory_common::identifier;
use thebestory_database::{OrderDirection, QueryCriteria, SqlxCrud, SqlxFilterQuery, SqlxSchema};

use crate::error::validate_content;
use crate::{ContentError, Page, Topic, TopicView, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Story {
    pub id: i64,
    pub topic_id: i64,
    pub author_id: i64,
    pub content: String,

    pub likes_count: i32,
    pub comments_count: i32,

    pub is_approved: bool,
    pub is_removed: bool,

    pub submitted_date: DateTime<Utc>,
    pub published_date: Option<DateTime<Utc>>,
    pub edited_date: Option<DateTime<Utc>>,
}

impl SqlxSchema for Story {
    const TABLE_NAME: &'static str = "stories";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "topic_id",
        "author_id",
        "content",
        "likes_count",
        "comments_count",
        "is_approved",
        "is_removed",
        "submitted_date",
        "published_date",
        "edited_date",
    ];
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS stories_published_date_idx ON stories (published_date DESC, id DESC)",
        "CREATE INDEX IF NOT EXISTS stories_likes_count_idx ON stories (likes_count DESC, id DESC)",
    ];

    fn create_table_sql() -> String {
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS stories (
                id BIGSERIAL PRIMARY KEY,
                topic_id BIGINT NOT NULL REFERENCES topics (id),
                author_id BIGINT NOT NULL REFERENCES users (id),
                content VARCHAR({}) NOT NULL,
                likes_count INTEGER NOT NULL DEFAULT 0,
                comments_count INTEGER NOT NULL DEFAULT 0,
                is_approved BOOLEAN NOT NULL DEFAULT FALSE,
                is_removed BOOLEAN NOT NULL DEFAULT FALSE,
                submitted_date TIMESTAMPTZ NOT NULL,
                published_date TIMESTAMPTZ,
                edited_date TIMESTAMPTZ
            )
            "#,
            Story::CONTENT_MAX_LENGTH
        )
    }
}

/// Orderings available to paginated feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Latest,
    Top,
}

impl Feed {
    fn sort_column(&self) -> &'static str {
        match self {
            Feed::Latest => "published_date",
            Feed::Top => "likes_count",
        }
    }
}

impl Story {
    /// Capacity of the `content` column, in characters.
    pub const CONTENT_MAX_LENGTH: usize = 8192;

    pub fn public_id(&self) -> String {
        identifier::encode_key(self.id)
    }

    /// Readers see a story only when it is neither removed nor pending.
    pub fn ensure_visible(&self) -> Result<(), ContentError> {
        if self.is_removed {
            return Err(ContentError::StoryNotFound);
        }
        if !self.is_approved {
            return Err(ContentError::StoryNotApproved);
        }
        Ok(())
    }

    pub fn validate_content(content: &str) -> Result<(), ContentError> {
        validate_content(content, Self::CONTENT_MAX_LENGTH)
    }

    pub async fn find_visible<'e, E>(id: i64, executor: E) -> Result<Self, ContentError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let story = Self::find_by_id(id, executor)
            .await?
            .ok_or(ContentError::StoryNotFound)?;
        story.ensure_visible()?;
        Ok(story)
    }

    fn published_criteria() -> QueryCriteria {
        QueryCriteria::new()
            .add_valued_filter("is_approved", "=", true)
            .add_valued_filter("is_removed", "=", false)
    }

    /// Builds the criteria for one page of a feed. The primary key breaks
    /// ties so that cursors stay stable.
    pub fn feed_criteria(feed: Feed, page: &Page) -> QueryCriteria {
        let mut criteria = Self::published_criteria();
        if let Some(pivot) = page.pivot {
            criteria = criteria.add_valued_filter("id", page.direction.comparator(), pivot);
        }

        criteria
            .order_by(feed.sort_column(), OrderDirection::Desc)
            .order_by("id", OrderDirection::Desc)
            .limit(page.limit)
    }

    pub async fn feed<'e, E>(feed: Feed, page: &Page, executor: E) -> Result<Vec<Self>, ContentError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        Ok(Self::find_by_criteria(Self::feed_criteria(feed, page), executor).await?)
    }

    pub async fn random<'e, E>(limit: i64, executor: E) -> Result<Vec<Self>, ContentError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let criteria = Self::published_criteria().order_by_random().limit(limit);
        Ok(Self::find_by_criteria(criteria, executor).await?)
    }

    /// Stores a new, unapproved story and bumps the topic and author
    /// counters in one transaction. The row is read back after commit; if it
    /// cannot be found the write is reported as unconfirmed.
    pub async fn submit(
        pool: &PgPool,
        topic_id: i64,
        author_id: i64,
        content: &str,
    ) -> Result<(Self, Topic), ContentError> {
        Self::validate_content(content)?;

        let mut tx = pool.begin().await?;

        let topic = Topic::increment_stories_count(topic_id, &mut *tx)
            .await?
            .ok_or(ContentError::TopicNotFound(topic_id))?;

        let story_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO stories (
                topic_id, author_id, content, likes_count, comments_count,
                is_approved, is_removed, submitted_date
            )
            VALUES ($1, $2, $3, 0, 0, FALSE, FALSE, $4)
            RETURNING id
            "#,
        )
        .bind(topic.id)
        .bind(author_id)
        .bind(content)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        User::increment_stories_count(author_id, &mut *tx).await?;

        tx.commit().await?;

        let story = Self::find_by_id(story_id, pool)
            .await?
            .ok_or(ContentError::StoryNotCommitted(story_id))?;

        tracing::info!("story {} submitted to topic {}", story.public_id(), topic.slug);
        Ok((story, topic))
    }

    pub async fn increment_comments_count<'e, E>(id: i64, executor: E) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE stories SET comments_count = comments_count + 1 WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn adjust_likes_count<'e, E>(id: i64, delta: i32, executor: E) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE stories SET likes_count = likes_count + $2 WHERE id = $1")
            .bind(id)
            .bind(delta)
            .execute(executor)
            .await?;
        Ok(())
    }
}

/// Public shape of a story.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryView {
    pub id: String,
    pub topic: TopicView,
    pub content: String,
    pub likes_count: i32,
    pub comments_count: i32,
    pub submitted_date: DateTime<Utc>,
    pub published_date: Option<DateTime<Utc>>,
    pub edited_date: Option<DateTime<Utc>>,
}

impl StoryView {
    pub fn new(story: Story, topic: TopicView) -> Self {
        Self {
            id: story.public_id(),
            topic,
            content: story.content,
            likes_count: story.likes_count,
            comments_count: story.comments_count,
            submitted_date: story.submitted_date,
            published_date: story.published_date,
            edited_date: story.edited_date,
        }
    }

    /// Feed entries only reference their topic by id.
    pub fn listed(story: Story) -> Self {
        let topic = TopicView::stub(story.topic_id);
        Self::new(story, topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Direction;
    use chrono::TimeZone;
    use serde_json::json;

    fn story(is_approved: bool, is_removed: bool) -> Story {
        Story {
            id: 36,
            topic_id: 2,
            author_id: 5,
            content: "Once upon a time".into(),
            likes_count: 3,
            comments_count: 1,
            is_approved,
            is_removed,
            submitted_date: Utc.with_ymd_and_hms(2017, 3, 1, 10, 0, 0).unwrap(),
            published_date: None,
            edited_date: None,
        }
    }

    #[test]
    fn removed_stories_are_not_found_regardless_of_approval() {
        assert!(matches!(story(true, true).ensure_visible(), Err(ContentError::StoryNotFound)));
        assert!(matches!(story(false, true).ensure_visible(), Err(ContentError::StoryNotFound)));
    }

    #[test]
    fn pending_stories_are_forbidden() {
        assert!(matches!(story(false, false).ensure_visible(), Err(ContentError::StoryNotApproved)));
        assert!(story(true, false).ensure_visible().is_ok());
    }

    #[test]
    fn latest_first_page() {
        let page = Page { pivot: None, limit: 25, direction: Direction::Before };
        let criteria = Story::feed_criteria(Feed::Latest, &page);
        assert_eq!(
            criteria.render("SELECT id FROM stories"),
            "SELECT id FROM stories WHERE is_approved = $1 AND is_removed = $2 \
             ORDER BY published_date DESC, id DESC LIMIT 25"
        );
    }

    #[test]
    fn top_with_before_pivot() {
        let page = Page { pivot: Some(100), limit: 10, direction: Direction::Before };
        let criteria = Story::feed_criteria(Feed::Top, &page);
        assert_eq!(
            criteria.render("SELECT id FROM stories"),
            "SELECT id FROM stories WHERE is_approved = $1 AND is_removed = $2 AND id > $3 \
             ORDER BY likes_count DESC, id DESC LIMIT 10"
        );
    }

    #[test]
    fn latest_with_after_pivot() {
        let page = Page { pivot: Some(100), limit: 10, direction: Direction::After };
        let criteria = Story::feed_criteria(Feed::Latest, &page);
        assert!(criteria
            .render("SELECT id FROM stories")
            .contains("AND id < $3 ORDER BY published_date DESC"));
    }

    #[test]
    fn listed_view_uses_public_id_and_topic_stub() {
        let view = StoryView::listed(story(true, false));
        assert_eq!(
            serde_json::to_value(view).unwrap(),
            json!({
                "id": "10",
                "topic": { "id": 2 },
                "content": "Once upon a time",
                "likes_count": 3,
                "comments_count": 1,
                "submitted_date": "2017-03-01T10:00:00Z",
                "published_date": null,
                "edited_date": null
            })
        );
    }
}
