//! Process configuration: flags first, environment as fallback, defaults
//! matching the reference deployment.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::pool::DEFAULT_POOL_CAPACITY;

#[derive(Debug, Parser)]
#[command(
    name = "anisub",
    version,
    about = "Personal video library server with scrub previews and resolution-variant streaming"
)]
pub struct ServerConfig {
    /// Root directory containing one folder per show.
    #[arg(long, env = "ANISUB_LIBRARY", default_value = "/app/anime_library")]
    pub library: PathBuf,

    /// Address to bind.
    #[arg(long, env = "ANISUB_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to bind.
    #[arg(long, env = "ANISUB_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Maximum number of simultaneously open decoder handles.
    #[arg(long, env = "ANISUB_POOL_CAPACITY", default_value_t = DEFAULT_POOL_CAPACITY)]
    pub pool_capacity: usize,
}
