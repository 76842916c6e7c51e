mod misc;
mod stories;

pub use misc::misc_routes;
pub use stories::story_routes;
