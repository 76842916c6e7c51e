use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, PgPool, Postgres};

use thebestory_common::identifier;
use thebestory_database::{OrderDirection, QueryCriteria, SqlxFilterQuery, SqlxSchema};

use crate::{ContentError, Story, User};

/// One like or unlike event. The log is append-only: the current state of a
/// (user, story) pair is its most recent event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StoryLike {
    pub id: i64,
    pub user_id: i64,
    pub story_id: i64,
    pub state: bool,
    pub timestamp: DateTime<Utc>,
}

impl SqlxSchema for StoryLike {
    const TABLE_NAME: &'static str = "story_likes";
    const COLUMNS: &'static [&'static str] = &["id", "user_id", "story_id", "state", "timestamp"];
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS story_likes_latest_idx ON story_likes (user_id, story_id, timestamp DESC, id DESC)",
    ];

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS story_likes (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users (id),
            story_id BIGINT NOT NULL REFERENCES stories (id),
            state BOOLEAN NOT NULL,
            timestamp TIMESTAMPTZ NOT NULL
        )
        "#
        .to_string()
    }
}

/// What a like/unlike request does to the log and the counters, given the
/// latest recorded state. No history counts as "not liked".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikePlan {
    pub append: bool,
    pub delta: i32,
}

impl LikePlan {
    pub fn new(latest: Option<bool>, requested: bool) -> Self {
        let append = latest != Some(requested);
        let current = latest.unwrap_or(false);
        let delta = match (current, requested) {
            (false, true) => 1,
            (true, false) => -1,
            _ => 0,
        };

        Self { append, delta }
    }
}

impl StoryLike {
    pub async fn latest<'e, E>(user_id: i64, story_id: i64, executor: E) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        Self::find_one_by_criteria(
            QueryCriteria::new()
                .add_valued_filter("user_id", "=", user_id)
                .add_valued_filter("story_id", "=", story_id)
                .order_by("timestamp", OrderDirection::Desc)
                .order_by("id", OrderDirection::Desc),
            executor,
        )
        .await
    }

    /// Records `state` for the pair and keeps `stories.likes_count` and
    /// `users.story_likes_count` in step.
    ///
    /// The story row is locked for the whole read-decide-append sequence, so
    /// concurrent toggles on one story are applied one after another.
    pub async fn toggle(pool: &PgPool, user_id: i64, story_id: i64, state: bool) -> Result<Self, ContentError> {
        let mut tx = pool.begin().await?;

        let sql = format!("{} FOR UPDATE", Story::select_by_id_sql());
        let story = sqlx::query_as::<_, Story>(&sql)
            .bind(story_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ContentError::StoryNotFound)?;

        if story.is_removed || !story.is_approved {
            return Err(ContentError::StoryNotFound);
        }

        let latest = Self::latest(user_id, story.id, &mut *tx).await?;
        let plan = LikePlan::new(latest.as_ref().map(|like| like.state), state);

        if !plan.append {
            tx.commit().await?;
            return latest.ok_or(ContentError::LikeNotCommitted(story.id));
        }

        sqlx::query("INSERT INTO story_likes (user_id, story_id, state, timestamp) VALUES ($1, $2, $3, $4)")
            .bind(user_id)
            .bind(story.id)
            .bind(state)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        if plan.delta != 0 {
            Story::adjust_likes_count(story.id, plan.delta, &mut *tx).await?;
            User::adjust_story_likes_count(user_id, plan.delta, &mut *tx).await?;
        }

        tx.commit().await?;

        let like = Self::latest(user_id, story.id, pool)
            .await?
            .ok_or(ContentError::LikeNotCommitted(story.id))?;

        tracing::debug!(
            "user {} set like state of story {} to {}",
            user_id,
            story.public_id(),
            like.state
        );
        Ok(like)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryLikeView {
    pub user_id: i64,
    pub story_id: String,
    pub state: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<StoryLike> for StoryLikeView {
    fn from(like: StoryLike) -> Self {
        Self {
            user_id: like.user_id,
            story_id: identifier::encode_key(like.story_id),
            state: like.state,
            timestamp: like.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_like_appends_and_increments() {
        assert_eq!(LikePlan::new(None, true), LikePlan { append: true, delta: 1 });
    }

    #[test]
    fn first_unlike_appends_without_touching_counters() {
        assert_eq!(LikePlan::new(None, false), LikePlan { append: true, delta: 0 });
    }

    #[test]
    fn repeated_state_is_a_no_op() {
        assert_eq!(LikePlan::new(Some(true), true), LikePlan { append: false, delta: 0 });
        assert_eq!(LikePlan::new(Some(false), false), LikePlan { append: false, delta: 0 });
    }

    #[test]
    fn flipping_state_adjusts_counters() {
        assert_eq!(LikePlan::new(Some(true), false), LikePlan { append: true, delta: -1 });
        assert_eq!(LikePlan::new(Some(false), true), LikePlan { append: true, delta: 1 });
    }

    #[test]
    fn like_like_unlike_returns_to_baseline() {
        let mut latest = None;
        let mut count = 0;
        for requested in [true, true, false] {
            let plan = LikePlan::new(latest, requested);
            count += plan.delta;
            if plan.append {
                latest = Some(requested);
            }
        }
        assert_eq!(count, 0);
        assert_eq!(latest, Some(false));
    }
}
