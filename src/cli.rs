use clap::{Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "tideserver")]
#[command(about = "CO-OPS tide and water level data as a cached JSON API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Server(ServerArgs),
    /// Run one request through the pipeline and print the response
    Fetch(FetchArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (defaults to server.bind_addr)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Request path, e.g. /station/9447130/water-level/20200101/verified
    pub path: String,

    /// Skip the cache lookup
    #[arg(long)]
    pub no_cache: bool,

    /// Do not write the result to the cache
    #[arg(long)]
    pub no_store: bool,
}
