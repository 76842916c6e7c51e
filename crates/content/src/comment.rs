use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, PgPool, Postgres};

use thebestory_common::identifier;
use thebestory_database::{SqlxCrud, SqlxSchema};

use crate::error::validate_content;
use crate::{ContentError, Story, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub story_id: i64,
    pub parent_id: Option<i64>,
    pub author_id: i64,
    pub content: String,

    /// Number of ancestors. Root comments have depth 0.
    pub depth: i32,

    pub likes_count: i32,
    pub comments_count: i32,

    pub submitted_date: DateTime<Utc>,
    pub edited_date: Option<DateTime<Utc>>,
}

impl SqlxSchema for Comment {
    const TABLE_NAME: &'static str = "comments";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "story_id",
        "parent_id",
        "author_id",
        "content",
        "depth",
        "likes_count",
        "comments_count",
        "submitted_date",
        "edited_date",
    ];
    const INDEXES_SQL: &'static [&'static str] =
        &["CREATE INDEX IF NOT EXISTS comments_story_id_idx ON comments (story_id, likes_count DESC)"];

    fn create_table_sql() -> String {
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id BIGSERIAL PRIMARY KEY,
                story_id BIGINT NOT NULL REFERENCES stories (id),
                parent_id BIGINT REFERENCES comments (id),
                author_id BIGINT NOT NULL REFERENCES users (id),
                content VARCHAR({}) NOT NULL,
                depth INTEGER NOT NULL DEFAULT 0,
                likes_count INTEGER NOT NULL DEFAULT 0,
                comments_count INTEGER NOT NULL DEFAULT 0,
                submitted_date TIMESTAMPTZ NOT NULL,
                edited_date TIMESTAMPTZ
            )
            "#,
            Comment::CONTENT_MAX_LENGTH
        )
    }
}

/// A comment joined with its author's username.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CommentWithAuthor {
    #[sqlx(flatten)]
    pub comment: Comment,
    pub author_username: String,
}

const SELECT_WITH_AUTHOR: &str = r#"
    SELECT
        c.id, c.story_id, c.parent_id, c.author_id, c.content, c.depth,
        c.likes_count, c.comments_count, c.submitted_date, c.edited_date,
        u.username AS author_username
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

impl Comment {
    pub const CONTENT_MAX_LENGTH: usize = 8192;

    /// Deepest reply level accepted on submission and rendered in a tree.
    pub const MAX_DEPTH: i32 = 32;

    /// All comments of a story, most liked first.
    pub async fn for_story<'e, E>(story_id: i64, executor: E) -> Result<Vec<CommentWithAuthor>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{SELECT_WITH_AUTHOR} WHERE c.story_id = $1 ORDER BY c.likes_count DESC, c.id ASC");
        sqlx::query_as::<_, CommentWithAuthor>(&sql)
            .bind(story_id)
            .fetch_all(executor)
            .await
    }

    pub async fn find_with_author<'e, E>(id: i64, executor: E) -> Result<Option<CommentWithAuthor>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{SELECT_WITH_AUTHOR} WHERE c.id = $1");
        sqlx::query_as::<_, CommentWithAuthor>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Adds a comment to a visible story, optionally as a reply. Story,
    /// parent and author counters move in the same transaction. Replies
    /// nested deeper than [`Comment::MAX_DEPTH`] are refused.
    pub async fn submit(
        pool: &PgPool,
        story_id: i64,
        parent_id: Option<i64>,
        author_id: i64,
        content: &str,
    ) -> Result<CommentWithAuthor, ContentError> {
        validate_content(content, Self::CONTENT_MAX_LENGTH)?;

        let mut tx = pool.begin().await?;

        let story = Story::find_visible(story_id, &mut *tx).await?;

        let mut depth = 0;
        if let Some(parent_id) = parent_id {
            let parent = Self::find_by_id(parent_id, &mut *tx)
                .await?
                .filter(|parent| parent.story_id == story.id)
                .ok_or(ContentError::ParentCommentNotFound)?;

            depth = parent.depth + 1;
            if depth > Self::MAX_DEPTH {
                return Err(ContentError::ReplyTooDeep { max: Self::MAX_DEPTH });
            }

            sqlx::query("UPDATE comments SET comments_count = comments_count + 1 WHERE id = $1")
                .bind(parent.id)
                .execute(&mut *tx)
                .await?;
        }

        let comment_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO comments (
                story_id, parent_id, author_id, content, depth, likes_count, comments_count, submitted_date
            )
            VALUES ($1, $2, $3, $4, $5, 0, 0, $6)
            RETURNING id
            "#,
        )
        .bind(story.id)
        .bind(parent_id)
        .bind(author_id)
        .bind(content)
        .bind(depth)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        Story::increment_comments_count(story.id, &mut *tx).await?;
        User::increment_comments_count(author_id, &mut *tx).await?;

        tx.commit().await?;

        Self::find_with_author(comment_id, pool)
            .await?
            .ok_or(ContentError::CommentNotCommitted(comment_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentParent {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentAuthor {
    pub id: i64,
    pub username: String,
}

/// A comment with its replies nested under `comments`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode {
    pub id: String,
    pub parent: Option<CommentParent>,
    pub author: CommentAuthor,
    pub content: String,
    pub comments: Vec<CommentNode>,
    pub likes_count: i32,
    pub comments_count: i32,
    pub submitted_date: DateTime<Utc>,
    pub edited_date: Option<DateTime<Utc>>,
}

impl CommentNode {
    pub fn new(row: CommentWithAuthor, comments: Vec<CommentNode>) -> Self {
        let CommentWithAuthor { comment, author_username } = row;
        Self {
            id: identifier::encode_key(comment.id),
            parent: comment.parent_id.map(|id| CommentParent { id: identifier::encode_key(id) }),
            author: CommentAuthor {
                id: comment.author_id,
                username: author_username,
            },
            content: comment.content,
            comments,
            likes_count: comment.likes_count,
            comments_count: comment.comments_count,
            submitted_date: comment.submitted_date,
            edited_date: comment.edited_date,
        }
    }
}

/// Turns a flat list into a forest of root comments.
///
/// Replies keep the order they have in `rows`. A comment whose parent is not
/// in `rows` is dropped together with its replies, and so is anything nested
/// deeper than [`Comment::MAX_DEPTH`]. Depth is measured on `rows`, not read
/// from the stored column.
pub fn build_comment_tree(rows: Vec<CommentWithAuthor>) -> Vec<CommentNode> {
    let index: HashMap<i64, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| (row.comment.id, i))
        .collect();

    let mut replies: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
    let mut roots = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        match row.comment.parent_id {
            None => roots.push(i),
            Some(parent_id) => match index.get(&parent_id) {
                Some(&parent) => replies[parent].push(i),
                None => tracing::warn!(
                    "dropping comment {} of story {}: parent {} is missing",
                    row.comment.id,
                    row.comment.story_id,
                    parent_id
                ),
            },
        }
    }

    // Breadth-first from the roots. Every comment has one parent, so each
    // reachable row is visited once and parent cycles are never entered.
    let mut order: Vec<usize> = Vec::with_capacity(rows.len());
    let mut depths: Vec<i32> = vec![0; rows.len()];
    order.extend(&roots);
    let mut next = 0;
    while next < order.len() {
        let at = order[next];
        next += 1;

        if depths[at] == Comment::MAX_DEPTH {
            if !replies[at].is_empty() {
                tracing::warn!(
                    "dropping {} replies to comment {}: nested deeper than {}",
                    replies[at].len(),
                    rows[at].comment.id,
                    Comment::MAX_DEPTH
                );
                replies[at].clear();
            }
            continue;
        }
        for &reply in &replies[at] {
            depths[reply] = depths[at] + 1;
            order.push(reply);
        }
    }

    // Children always come after their parent in `order`, so walking it
    // backwards finishes every subtree before its parent is assembled.
    let mut slots: Vec<Option<CommentWithAuthor>> = rows.into_iter().map(Some).collect();
    let mut built: Vec<Option<CommentNode>> = vec![None; slots.len()];
    for &at in order.iter().rev() {
        let Some(row) = slots[at].take() else { continue };
        let comments = replies[at]
            .iter()
            .filter_map(|&reply| built[reply].take())
            .collect();
        built[at] = Some(CommentNode::new(row, comments));
    }

    roots
        .into_iter()
        .filter_map(|root| built[root].take())
        .collect()
}
