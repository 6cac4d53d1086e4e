use clap::Parser;
use log::info;
use server::config::ArenaConfig;
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Maximum number of concurrent clients
    #[arg(short, long, default_value = "32")]
    max_clients: usize,

    /// Arena width in pixels
    #[arg(long, default_value_t = shared::ARENA_WIDTH)]
    width: i32,

    /// Arena height in pixels
    #[arg(long, default_value_t = shared::ARENA_HEIGHT)]
    height: i32,

    /// Collectibles kept alive at all times
    #[arg(long, default_value = "1")]
    min_collectibles: usize,

    /// Seed for spawn positions (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Seconds between stats log lines
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    stats_interval: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ArenaConfig {
        width: args.width,
        height: args.height,
        min_collectibles: args.min_collectibles,
        seed: args.seed,
        ..ArenaConfig::default()
    };

    let address = format!("{}:{}", args.host, args.port);
    info!(
        "Starting arena {}x{} on {} (max {} clients)",
        config.width, config.height, address, args.max_clients
    );

    let mut server = Server::new(
        &address,
        config,
        args.max_clients,
        Duration::from_secs(args.stats_interval),
    )
    .await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
