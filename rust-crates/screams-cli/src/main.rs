use clap::{
    Parser,
    Subcommand,
};
use somnia_screams::achievements::AchievementCategory;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "false")]
    tracing: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode an achievement flags value read from the ledger
    Decode {
        /// Flags as a decimal number or 0x-prefixed hex
        flags: String,

        #[arg(short, long)]
        category: Option<AchievementCategory>,

        #[arg(long)]
        json: bool,
    },
    /// Play a scripted session against the in-memory ledger
    Simulate {
        #[arg(short, long, default_value_t = 23)]
        souls: u32,

        /// Reject the first batch submission
        #[arg(long)]
        fail_first: bool,

        /// Hold batches on the ledger until the session-end flush
        #[arg(long)]
        deferred: bool,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        batch_limit: Option<u32>,

        #[arg(long)]
        points_per_soul: Option<u64>,

        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.tracing {
        init_tracing();
    }
    let output = match args.command {
        Command::Decode {
            flags,
            category,
            json,
        } => {
            let flags = commands::parse_flags(&flags)?;
            commands::decode(flags, category, json)?
        }
        Command::Simulate {
            souls,
            fail_first,
            deferred,
            config,
            batch_limit,
            points_per_soul,
            json,
        } => {
            let config =
                commands::resolve_config(config.as_deref(), batch_limit, points_per_soul)?;
            let options = commands::SimulateOptions {
                souls,
                fail_first,
                deferred,
            };
            let report = commands::simulate(&config, options).await?;
            commands::render_report(&report, json)?
        }
    };
    println!("{output}");
    Ok(())
}
