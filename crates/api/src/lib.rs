mod env;
mod global_state;
mod response;
mod routes;
mod utils;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use env::ApiServerEnv;
pub use global_state::GlobalState;
pub use response::{AppError, AppSuccess, ErrorCode, ResponseStatus};
pub use routes::{misc_routes, story_routes};
pub use utils::setup_tracing;

/// The full HTTP surface with its middleware.
pub fn app(state: GlobalState) -> Router {
    Router::new()
        .merge(story_routes())
        .merge(misc_routes())
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
