use anyhow::anyhow;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use thebestory_common::{identifier, ModuleClient};
use thebestory_content::{
    build_comment_tree, Comment, CommentNode, Feed, Story, StoryLike, StoryLikeView, StoryView, Topic, TopicView,
};
use thebestory_database::SqlxCrud;

use crate::response::{AppError, AppSuccess, ErrorCode};
use crate::GlobalState;

pub fn story_routes() -> Router<GlobalState> {
    Router::new()
        .route("/stories", post(submit_story))
        .route("/stories/latest", get(latest_stories))
        .route("/stories/top", get(top_stories))
        .route("/stories/random", get(random_stories))
        .route("/stories/{id}", get(get_story))
        .route("/stories/{id}/comments",
            get(list_comments)
            .post(submit_comment)
        )
        .route("/stories/{id}/like", post(like_story))
        .route("/stories/{id}/unlike", post(unlike_story))
}

fn malformed_body(rejection: JsonRejection) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, ErrorCode::MalformedInput, anyhow!(rejection.body_text()))
}

fn malformed_id(rejection: PathRejection) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, ErrorCode::BadIdentifier, anyhow!(rejection.body_text()))
}

fn malformed_listing(rejection: QueryRejection) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, ErrorCode::BadListing, anyhow!(rejection.body_text()))
}

#[derive(Debug, Deserialize)]
pub struct SubmitStoryRequest {
    topic: i64,
    content: String,
}
async fn submit_story(
    State(state): State<GlobalState>,
    payload: Result<Json<SubmitStoryRequest>, JsonRejection>,
) -> Result<AppSuccess, AppError> {
    let Json(payload) = payload.map_err(malformed_body)?;

    let (story, topic) = Story::submit(
        state.db.get_client(),
        payload.topic,
        state.anonymous_user_id,
        &payload.content,
    ).await?;

    Ok(AppSuccess::new(StatusCode::CREATED, json!(StoryView::new(story, topic.into()))))
}

/// Raw pagination parameters. Values stay strings so that every malformed
/// input is reported by the listing validator.
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    before: Option<String>,
    after: Option<String>,
    limit: Option<String>,
}
async fn latest_stories(
    State(state): State<GlobalState>,
    query: Result<Query<ListingQuery>, QueryRejection>,
) -> Result<AppSuccess, AppError> {
    list_feed(&state, Feed::Latest, query).await
}
async fn top_stories(
    State(state): State<GlobalState>,
    query: Result<Query<ListingQuery>, QueryRejection>,
) -> Result<AppSuccess, AppError> {
    list_feed(&state, Feed::Top, query).await
}
async fn list_feed(
    state: &GlobalState,
    feed: Feed,
    query: Result<Query<ListingQuery>, QueryRejection>,
) -> Result<AppSuccess, AppError> {
    let Query(query) = query.map_err(malformed_listing)?;
    let page = state.listing.validate(
        query.before.as_deref(),
        query.after.as_deref(),
        query.limit.as_deref(),
    )?;

    let stories: Vec<StoryView> = Story::feed(feed, &page, state.db.get_client()).await?
        .into_iter()
        .map(StoryView::listed)
        .collect();

    Ok(AppSuccess::new(StatusCode::OK, json!(stories)))
}

#[derive(Debug, Deserialize)]
pub struct RandomQuery {
    limit: Option<String>,
}
async fn random_stories(
    State(state): State<GlobalState>,
    query: Result<Query<RandomQuery>, QueryRejection>,
) -> Result<AppSuccess, AppError> {
    let Query(query) = query.map_err(malformed_listing)?;
    let limit = state.listing.validate_limit(query.limit.as_deref())?;

    let stories: Vec<StoryView> = Story::random(limit, state.db.get_client()).await?
        .into_iter()
        .map(StoryView::listed)
        .collect();

    Ok(AppSuccess::new(StatusCode::OK, json!(stories)))
}

async fn get_story(
    State(state): State<GlobalState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<AppSuccess, AppError> {
    let Path(id) = id.map_err(malformed_id)?;
    let id = identifier::decode_key(&id)?;
    let pool = state.db.get_client();

    let story = Story::find_visible(id, pool).await?;
    match Topic::find_by_id(story.topic_id, pool).await? {
        Some(topic) => Ok(AppSuccess::new(
            StatusCode::OK,
            json!(StoryView::new(story, topic.into()))
        )),
        None => {
            tracing::warn!("topic {} of story {} is missing", story.topic_id, story.public_id());
            let topic = TopicView::stub(story.topic_id);
            Ok(AppSuccess::new(StatusCode::OK, json!(StoryView::new(story, topic)))
                .with_warning(ErrorCode::PARTIAL_RESULT))
        }
    }
}

async fn list_comments(
    State(state): State<GlobalState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<AppSuccess, AppError> {
    let Path(id) = id.map_err(malformed_id)?;
    let id = identifier::decode_key(&id)?;
    let pool = state.db.get_client();

    let story = Story::find_visible(id, pool).await?;
    let comments = build_comment_tree(Comment::for_story(story.id, pool).await?);

    Ok(AppSuccess::new(StatusCode::OK, json!(comments)))
}

#[derive(Debug, Deserialize)]
pub struct SubmitCommentRequest {
    content: String,
    /// Public id of the comment being replied to.
    parent: Option<String>,
}
async fn submit_comment(
    State(state): State<GlobalState>,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<SubmitCommentRequest>, JsonRejection>,
) -> Result<AppSuccess, AppError> {
    let Path(id) = id.map_err(malformed_id)?;
    let story_id = identifier::decode_key(&id)?;
    let Json(payload) = payload.map_err(malformed_body)?;
    let parent_id = payload.parent
        .as_deref()
        .map(identifier::decode_key)
        .transpose()?;

    let row = Comment::submit(
        state.db.get_client(),
        story_id,
        parent_id,
        state.anonymous_user_id,
        &payload.content,
    ).await?;

    Ok(AppSuccess::new(StatusCode::CREATED, json!(CommentNode::new(row, Vec::new()))))
}

async fn like_story(
    State(state): State<GlobalState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<AppSuccess, AppError> {
    let Path(id) = id.map_err(malformed_id)?;
    set_like_state(&state, &id, true).await
}
async fn unlike_story(
    State(state): State<GlobalState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<AppSuccess, AppError> {
    let Path(id) = id.map_err(malformed_id)?;
    set_like_state(&state, &id, false).await
}
async fn set_like_state(state: &GlobalState, id: &str, liked: bool) -> Result<AppSuccess, AppError> {
    let story_id = identifier::decode_key(id)?;
    let like = StoryLike::toggle(state.db.get_client(), state.anonymous_user_id, story_id, liked).await?;

    Ok(AppSuccess::new(StatusCode::CREATED, json!(StoryLikeView::from(like))))
}
