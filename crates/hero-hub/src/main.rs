use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use hero_core::config::AuthMode;
use hero_core::HeroConfig;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "hero-hub")]
#[command(about = "Real-time hazard, ride, first aid and chat relay", version)]
struct Args {
    /// Path to hero.toml (falls back to HERO_CONFIG, then ~/.hero/hero.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hero_hub=info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();

    // explicit path > HERO_CONFIG env > ~/.hero/hero.toml
    let config_path = args.config.or_else(|| std::env::var("HERO_CONFIG").ok());
    let mut config = HeroConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        HeroConfig::default()
    });
    if let Some(bind) = args.bind {
        config.hub.bind = bind;
    }
    if let Some(port) = args.port {
        config.hub.port = port;
    }

    match config.hub.auth.mode {
        AuthMode::None => warn!(
            "auth.mode = none: any connected participant can remove any record"
        ),
        AuthMode::Credential if config.hub.auth.password.is_none() => warn!(
            "auth.mode = credential but no password is set: removals are disabled for everyone"
        ),
        AuthMode::Credential => {}
    }

    let addr: SocketAddr = config.listen_addr().parse()?;
    let state = Arc::new(hero_hub::AppState::new(config));
    let router = hero_hub::build_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Hero hub listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            let closed = state.hub().retire_all();
            info!(connections = closed, "Shutting down...");
        })
        .await?;
    Ok(())
}
