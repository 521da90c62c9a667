use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

mod cli;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a YAML option file; built-in defaults are used when omitted.
    #[arg(short, long)]
    option: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download whole albums
    Album(cli::AlbumArgs),
    /// Download single photos (chapters)
    Photo(cli::PhotoArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Cli::parse();
    let option = cli::load_option(&args.option)?;

    match &args.command {
        Commands::Album(album_args) => {
            info!("Starting album download...");
            cli::run_album(option, album_args).await?;
        }
        Commands::Photo(photo_args) => {
            info!("Starting photo download...");
            cli::run_photo(option, photo_args).await?;
        }
    }

    Ok(())
}
