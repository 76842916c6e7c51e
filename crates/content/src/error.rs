use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("story not found")]
    StoryNotFound,

    #[error("story is not approved yet")]
    StoryNotApproved,

    #[error("topic {0} not found")]
    TopicNotFound(i64),

    #[error("parent comment not found in this story")]
    ParentCommentNotFound,

    #[error("replies cannot be nested deeper than {max} levels")]
    ReplyTooDeep { max: i32 },

    #[error("content is empty")]
    EmptyContent,

    #[error("content is longer than {max} characters")]
    ContentTooLong { max: usize },

    #[error("story {0} was submitted but could not be read back")]
    StoryNotCommitted(i64),

    #[error("comment {0} was submitted but could not be read back")]
    CommentNotCommitted(i64),

    #[error("like state of story {0} could not be read back")]
    LikeNotCommitted(i64),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Shared length check for user submitted text. Length is counted in
/// characters, not bytes.
pub(crate) fn validate_content(content: &str, max: usize) -> Result<(), ContentError> {
    let length = content.chars().count();
    if length == 0 {
        return Err(ContentError::EmptyContent);
    }
    if length > max {
        return Err(ContentError::ContentTooLong { max });
    }
    Ok(())
}
