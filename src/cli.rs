//! Command implementations for the `cdl` binary.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use comic_downloader::{DownloadOption, Downloader};

/// Command-line arguments for album downloads.
#[derive(clap::Args, Debug)]
pub struct AlbumArgs {
    /// Album ids to download.
    #[clap(required = true)]
    pub ids: Vec<String>,
}

/// Command-line arguments for photo downloads.
#[derive(clap::Args, Debug)]
pub struct PhotoArgs {
    /// Photo ids to download.
    #[clap(required = true)]
    pub ids: Vec<String>,
}

/// Loads the option file, falling back to defaults when none was given.
pub fn load_option(path: &Option<PathBuf>) -> Result<DownloadOption> {
    match path {
        Some(p) => Ok(DownloadOption::from_file(p)?),
        None => Ok(DownloadOption::default()),
    }
}

/// Downloads every requested album, then reports aggregate failures.
pub async fn run_album(option: DownloadOption, args: &AlbumArgs) -> Result<()> {
    let downloader = Downloader::new(option);
    for id in &args.ids {
        let album = downloader.scope(downloader.download_album(id)).await?;
        info!("Album [{}] {} finished", album.album_id, album.name);
    }
    downloader.raise_if_has_exception()?;
    Ok(())
}

/// Downloads every requested photo, then reports aggregate failures.
pub async fn run_photo(option: DownloadOption, args: &PhotoArgs) -> Result<()> {
    let downloader = Downloader::new(option);
    for id in &args.ids {
        let photo = downloader.scope(downloader.download_photo(id)).await?;
        info!("Photo [{}] {} finished", photo.photo_id, photo.name);
    }
    downloader.raise_if_has_exception()?;
    Ok(())
}
