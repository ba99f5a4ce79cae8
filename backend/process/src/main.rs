use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use track::{GeometryConfig, remote::OPENF1_URL};

use process::{LapWindow, Publish};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a clean outline from one lap of position samples
    Extract {
        #[arg(long)]
        session_key: u32,

        #[arg(long, default_value_t = 1)]
        driver: u32,

        /// Lap start, RFC 3339
        #[arg(long)]
        start: DateTime<Utc>,

        /// Lap duration in seconds
        #[arg(long)]
        duration: f64,

        /// Target point count, 0 keeps every resampled point
        #[arg(long, default_value_t = 200)]
        target_count: usize,

        /// Write the points here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also upsert the outline into the store under this circuit key
        #[arg(long, requires = "redis_url")]
        circuit: Option<String>,

        /// Display name stored alongside the outline
        #[arg(long, requires = "circuit")]
        name: Option<String>,

        #[arg(long, env = "REDIS_URL")]
        redis_url: Option<String>,

        #[arg(long, env = "OPENF1_URL", default_value = OPENF1_URL)]
        openf1_url: String,
    },

    /// Upsert the seeded outlines into the store
    Seed {
        #[arg(long, env = "REDIS_URL")]
        redis_url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Extract {
            session_key,
            driver,
            start,
            duration,
            target_count,
            output,
            circuit,
            name,
            redis_url,
            openf1_url,
        } => {
            let window = LapWindow::new(session_key, driver, start, duration)?;
            let config = GeometryConfig {
                downsample_target_count: (target_count > 0).then_some(target_count),
                ..GeometryConfig::default()
            };
            let publish = Publish {
                output,
                circuit,
                name,
                redis_url,
            };

            process::extract_lap(&openf1_url, &window, &config, &publish).await
        }
        Command::Seed { redis_url } => process::seed(&redis_url).await,
    }
}
