mod comment;
mod error;
pub mod listing;
mod story;
mod story_like;
mod topic;
mod user;

pub use comment::{build_comment_tree, Comment, CommentAuthor, CommentNode, CommentParent, CommentWithAuthor};
pub use error::ContentError;
pub use listing::{Direction, Listing, ListingError, Page};
pub use story::{Feed, Story, StoryView};
pub use story_like::{LikePlan, StoryLike, StoryLikeView};
pub use topic::{Topic, TopicView};
pub use user::{User, ANONYMOUS_USER_ID};

// Referenced tables first.
thebestory_database::init_databases!(Topic, User, Story, Comment, StoryLike);
