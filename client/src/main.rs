use clap::Parser;
use client::input::{InputManager, DEFAULT_STEP};
use client::network::Client;
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3000")]
    server: String,

    /// Pixels per move command
    #[arg(long, default_value_t = DEFAULT_STEP)]
    step: f64,

    /// Play with random moves instead of console input
    #[arg(short, long)]
    bot: bool,

    /// Bot moves per second
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..=1000))]
    moves_per_second: u64,

    /// Seed for bot moves
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);

    let input_manager = match args.seed {
        Some(seed) => InputManager::with_seed(args.step, seed),
        None => InputManager::new(args.step),
    };
    let bot_interval = args
        .bot
        .then(|| Duration::from_millis(1000 / args.moves_per_second));
    if args.bot {
        info!("Bot mode: {} moves per second", args.moves_per_second);
    }

    let mut client = Client::new(&args.server, input_manager, bot_interval).await?;

    tokio::select! {
        result = client.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, leaving");
        }
    }

    Ok(())
}
