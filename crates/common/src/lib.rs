mod client;
mod env;
pub mod identifier;

pub use client::ModuleClient;
pub use env::{EnvVars, required_var, try_load};
pub use identifier::IdentifierError;
