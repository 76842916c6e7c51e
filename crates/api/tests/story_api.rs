//! End to end requests through the router against the database in
//! `DATABASE_URL`. Every test returns early when it is not set.

use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tokio::sync::OnceCell;
use tower::ServiceExt;

use thebestory_api::{app, GlobalState};
use thebestory_common::identifier;
use thebestory_content::{init_schema, Listing, Topic, User, ANONYMOUS_USER_ID};
use thebestory_database::PostgresClient;

static SCHEMA: OnceCell<()> = OnceCell::const_new();
static SEQUENCE: AtomicU32 = AtomicU32::new(0);

fn database_url() -> Option<String> {
    dotenv::dotenv().ok();
    match std::env::var("DATABASE_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping");
            None
        }
    }
}

async fn test_pool() -> Result<Option<PgPool>> {
    let Some(database_url) = database_url() else { return Ok(None) };

    let pool = PgPool::connect(&database_url).await?;
    SCHEMA
        .get_or_try_init(|| async {
            init_schema(&pool).await?;
            User::ensure_exists(ANONYMOUS_USER_ID, "anonymous", &pool).await?;
            Ok::<_, sqlx::Error>(())
        })
        .await?;

    Ok(Some(pool))
}

fn router(pool: PgPool) -> Router {
    app(GlobalState::from_parts(
        PostgresClient::from_pool(pool),
        Listing::default(),
        ANONYMOUS_USER_ID,
    ))
}

async fn send(router: Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = router.oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

async fn get(pool: &PgPool, uri: &str) -> Result<(StatusCode, Value)> {
    send(router(pool.clone()), Request::get(uri).body(Body::empty())?).await
}

async fn post_json(pool: &PgPool, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))?;
    send(router(pool.clone()), request).await
}

async fn new_topic(pool: &PgPool) -> Result<Topic> {
    let suffix = format!(
        "{}{}",
        chrono::Utc::now().timestamp_micros() % 1_000_000_000_000,
        SEQUENCE.fetch_add(1, Ordering::Relaxed)
    );
    Ok(Topic::create(&format!("a{suffix}"), "Api", "Api test topic", "test", pool).await?)
}

/// Submits a story over HTTP and returns its public id.
async fn submit(pool: &PgPool, topic: &Topic) -> Result<String> {
    let (status, body) = post_json(pool, "/stories", json!({ "topic": topic.id, "content": "Via HTTP" })).await?;
    assert_eq!(status, StatusCode::CREATED, "body: {body}");
    Ok(body["data"]["id"].as_str().expect("story id is a string").to_string())
}

async fn set_flags(pool: &PgPool, public_id: &str, is_approved: bool, is_removed: bool) -> Result<()> {
    sqlx::query(
        "UPDATE stories SET is_approved = $2, is_removed = $3, published_date = NOW() WHERE id = $1",
    )
    .bind(identifier::decode_key(public_id)?)
    .bind(is_approved)
    .bind(is_removed)
    .execute(pool)
    .await?;
    Ok(())
}

fn assert_error(response: (StatusCode, Value), status: StatusCode, code: u16) {
    let (actual_status, body) = response;
    assert_eq!(actual_status, status, "unexpected status, body: {body}");
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], code);
}

#[tokio::test]
async fn submission_answers_created_with_refreshed_topic() -> Result<()> {
    let Some(pool) = test_pool().await? else { return Ok(()) };

    let topic = new_topic(&pool).await?;
    let (status, body) = post_json(&pool, "/stories", json!({ "topic": topic.id, "content": "Hello" })).await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "ok");
    assert!(body.get("code").is_none());

    let story = &body["data"];
    assert_eq!(story["content"], "Hello");
    assert_eq!(story["likes_count"], 0);
    assert_eq!(story["comments_count"], 0);
    assert!(story["submitted_date"].is_string());
    assert!(story["published_date"].is_null());
    assert_eq!(story["topic"]["id"], topic.id);
    assert_eq!(story["topic"]["slug"], topic.slug.as_str());
    assert_eq!(story["topic"]["stories_count"], topic.stories_count + 1);
    Ok(())
}

#[tokio::test]
async fn submission_to_unknown_topic_is_a_bad_request() -> Result<()> {
    let Some(pool) = test_pool().await? else { return Ok(()) };

    let response = post_json(&pool, "/stories", json!({ "topic": i64::MAX, "content": "Lost" })).await?;
    assert_error(response, StatusCode::BAD_REQUEST, 2002);
    Ok(())
}

#[tokio::test]
async fn detail_follows_moderation_state() -> Result<()> {
    let Some(pool) = test_pool().await? else { return Ok(()) };

    let topic = new_topic(&pool).await?;
    let id = submit(&pool, &topic).await?;
    let uri = format!("/stories/{id}");

    assert_error(get(&pool, &uri).await?, StatusCode::FORBIDDEN, 4001);
    assert_error(get(&pool, &format!("{uri}/comments")).await?, StatusCode::FORBIDDEN, 4001);

    set_flags(&pool, &id, true, false).await?;
    let (status, body) = get(&pool, &uri).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["data"]["id"], id.as_str());
    assert!(body["data"]["published_date"].is_string());
    assert_eq!(body["data"]["topic"]["title"], "Api");

    set_flags(&pool, &id, true, true).await?;
    assert_error(get(&pool, &uri).await?, StatusCode::NOT_FOUND, 2003);
    assert_error(get(&pool, &format!("{uri}/comments")).await?, StatusCode::NOT_FOUND, 2003);
    assert_error(post_json(&pool, &format!("{uri}/like"), json!({})).await?, StatusCode::NOT_FOUND, 2003);
    Ok(())
}

#[tokio::test]
async fn detail_with_missing_topic_is_a_warning() -> Result<()> {
    let Some(pool) = test_pool().await? else { return Ok(()) };
    let Some(database_url) = database_url() else { return Ok(()) };

    let topic = new_topic(&pool).await?;
    let id = submit(&pool, &topic).await?;
    set_flags(&pool, &id, true, false).await?;

    // An empty temporary `topics` shadows the real table on every connection
    // of this pool, so the story's topic cannot be found.
    let shadowed = PgPoolOptions::new()
        .max_connections(1)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("CREATE TEMP TABLE topics (LIKE topics)").await?;
                Ok(())
            })
        })
        .connect(&database_url)
        .await?;

    let (status, body) = get(&shadowed, &format!("/stories/{id}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "warning");
    assert_eq!(body["code"], 2002);
    assert_eq!(body["data"]["id"], id.as_str());
    assert_eq!(body["data"]["topic"], json!({ "id": topic.id }));
    Ok(())
}

#[tokio::test]
async fn like_and_unlike_echo_the_public_story_id() -> Result<()> {
    let Some(pool) = test_pool().await? else { return Ok(()) };

    let topic = new_topic(&pool).await?;
    let id = submit(&pool, &topic).await?;
    set_flags(&pool, &id, true, false).await?;

    for _ in 0..2 {
        let (status, body) = post_json(&pool, &format!("/stories/{id}/like"), json!({})).await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["story_id"], id.as_str());
        assert_eq!(body["data"]["user_id"], ANONYMOUS_USER_ID);
        assert_eq!(body["data"]["state"], true);
    }

    let (_, body) = get(&pool, &format!("/stories/{id}")).await?;
    assert_eq!(body["data"]["likes_count"], 1);

    let (status, body) = post_json(&pool, &format!("/stories/{id}/unlike"), json!({})).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["state"], false);

    let (_, body) = get(&pool, &format!("/stories/{id}")).await?;
    assert_eq!(body["data"]["likes_count"], 0);
    Ok(())
}

#[tokio::test]
async fn comments_round_trip_as_a_tree() -> Result<()> {
    let Some(pool) = test_pool().await? else { return Ok(()) };

    let topic = new_topic(&pool).await?;
    let id = submit(&pool, &topic).await?;
    set_flags(&pool, &id, true, false).await?;
    let uri = format!("/stories/{id}/comments");

    let (status, root) = post_json(&pool, &uri, json!({ "content": "Root" })).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert!(root["data"]["parent"].is_null());
    assert_eq!(root["data"]["author"]["username"], "anonymous");
    let root_id = root["data"]["id"].as_str().expect("comment id is a string").to_string();

    let (status, reply) = post_json(&pool, &uri, json!({ "content": "Reply", "parent": root_id })).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["data"]["parent"]["id"], root_id.as_str());

    let missing_parent = post_json(&pool, &uri, json!({ "content": "Lost", "parent": "zzzzzzzzzz" })).await?;
    assert_error(missing_parent, StatusCode::BAD_REQUEST, 2002);

    let (status, tree) = get(&pool, &uri).await?;
    assert_eq!(status, StatusCode::OK);
    let roots = tree["data"].as_array().expect("comment list");
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["id"], root_id.as_str());
    assert_eq!(roots[0]["comments_count"], 1);
    assert_eq!(roots[0]["comments"][0]["content"], "Reply");
    Ok(())
}
