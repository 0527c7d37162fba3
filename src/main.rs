use std::sync::Arc;

use clap::{Parser, Subcommand};

use coinpulse::bot::Bot;
use coinpulse::config::AppConfig;
use coinpulse::observability;
use coinpulse::scheduler::{spawn_signal_listener, StopSignal};

#[derive(Parser, Debug)]
#[command(author, version, about = "Scheduled crypto price bot for Telegram")]
struct Cli {
    /// Config environment; loads config/<env>.toml on top of the defaults.
    #[arg(long)]
    env: Option<String>,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run forever, posting at each interval boundary (default)
    Run,
    /// Post once and exit
    Once,
    /// Send a single demo message with live data
    Demo,
    /// Post a text price chart for one coin
    Chart {
        /// CoinGecko coin id, e.g. "bitcoin"
        coin_id: String,
    },
    /// Execute exactly one cycle for a scheduled trigger and print the result
    Cron,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.env.as_deref())?;
    let bot = Bot::new(config).await?;

    match cli.cmd.unwrap_or(Command::Run) {
        Command::Run => {
            let stop = StopSignal::new();
            spawn_signal_listener(stop.clone());
            Arc::new(bot).run_forever(stop).await;
        }
        Command::Once => bot.run_once().await?,
        Command::Demo => bot.run_demo().await?,
        Command::Chart { coin_id } => bot.run_chart(&coin_id).await?,
        Command::Cron => {
            let (status, body) = bot.run_cron().await;
            println!("{} {}", status, body);
            if status != 200 {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
