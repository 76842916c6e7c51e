use std::net::{Ipv6Addr, SocketAddr};

use anyhow::Result;

use thebestory_api::{app, setup_tracing, ApiServerEnv, GlobalState};
use thebestory_common::EnvVars;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing()?;

    let env = ApiServerEnv::load()?;
    let state = GlobalState::new(&env).await?;

    let addr = SocketAddr::from((Ipv6Addr::UNSPECIFIED, env.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("LISTENING ON {}", env.port);
    axum::serve(listener, app(state).into_make_service()).await?;
    Ok(())
}
