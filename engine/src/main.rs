use std::io::{Error, ErrorKind};
use std::time::Duration;
use clap::Parser;
use tictactoe_engine::server::{self, ServerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,
    #[arg(long, default_value_t = 9999)]
    port: u16,
    /// Delay before each computer move, in milliseconds
    #[arg(long, default_value_t = 500)]
    think_ms: u64,
    /// Seed for the computer's random choices (Easy and Medium)
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value = "info")]
    log_level: log::Level,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            think: Duration::from_millis(args.think_ms),
            seed: args.seed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    simple_logger::init_with_level(args.log_level)
        .map_err(|e| Error::new(ErrorKind::Other, e))?;

    server::run(args.into()).await
}
