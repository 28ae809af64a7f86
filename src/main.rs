mod cli;

use axum::http::Method;
use clap::Parser;
use cli::{Cli, Commands, FetchArgs};
use tideserver::api::{AppState, HttpMap, Request};
use tideserver::config::Config;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load().map_err(|e| format!("Failed to load config: {e}"))?;

    match cli.command {
        Commands::Server(args) => tideserver::api::run(config, args.address).await?,
        Commands::Fetch(args) => fetch(config, args).await?,
    }

    Ok(())
}

async fn fetch(config: Config, args: FetchArgs) -> Result<(), AnyError> {
    let state = AppState::from_config(config)?;

    let mut query = HttpMap::new();
    if args.no_cache {
        query.insert("no-cache", "");
    }
    if args.no_store {
        query.insert("no-store", "");
    }

    let request = Request::new(Method::GET, args.path, Uuid::new_v4().to_string()).with_query(query);
    let response = state.pipeline.handle(&request).await;

    println!("{}", response.status);
    for (name, value) in response.headers.iter() {
        println!("{name}: {value}");
    }
    println!();
    println!("{}", response.body);

    Ok(())
}
