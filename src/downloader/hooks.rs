//! Policy hooks for the downloader.
//!
//! The default implementation downloads everything; variants override single
//! methods to change one behavior, e.g. dry runs that transfer no bytes, or a
//! shared countdown that stops after a fixed number of images.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::client::ComicClient;
use crate::entity::{AlbumDetail, ImageDetail, PhotoDetail};
use crate::error::Result;
use crate::utils::file;

/// Overridable download policy. All methods have defaults.
#[async_trait]
pub trait DownloadHooks: Send + Sync {
    /// Filters an album before its photos are dispatched (identity by default).
    fn filter_album(&self, album: AlbumDetail) -> AlbumDetail {
        album
    }

    /// Filters a photo before its images are dispatched (identity by default).
    fn filter_photo(&self, photo: PhotoDetail) -> PhotoDetail {
        photo
    }

    /// Admission check before an image transfer. Returning `false` skips the
    /// image without recording success or failure.
    fn should_download(&self, _image: &ImageDetail) -> bool {
        true
    }

    /// Fetches the image bytes and writes them to `path`.
    async fn save_image(
        &self,
        client: &dyn ComicClient,
        image: &ImageDetail,
        path: &Path,
    ) -> Result<()> {
        let data = client.fetch_image_data(image).await?;
        file::save_bytes(path, &data)
    }
}

/// The standard policy: download and save everything.
#[derive(Debug, Default)]
pub struct DefaultHooks;

#[async_trait]
impl DownloadHooks for DefaultHooks {}

/// Walks the whole tree and decides save paths but transfers no bytes.
/// Useful to verify album structure and naming without network cost.
#[derive(Debug, Default)]
pub struct DryRunHooks;

#[async_trait]
impl DownloadHooks for DryRunHooks {
    async fn save_image(
        &self,
        _client: &dyn ComicClient,
        _image: &ImageDetail,
        _path: &Path,
    ) -> Result<()> {
        Ok(())
    }
}

/// Stops downloading after a fixed number of images. The counter is shared
/// across clones, so concurrent workers and multiple downloader instances
/// draw from the same budget.
#[derive(Debug, Clone)]
pub struct CountdownHooks {
    remaining: Arc<AtomicI64>,
}

impl CountdownHooks {
    /// Creates a hook allowing `count` image downloads.
    pub fn new(count: i64) -> Self {
        Self {
            remaining: Arc::new(AtomicI64::new(count)),
        }
    }

    /// Resets the shared budget.
    pub fn set_count(&self, count: i64) {
        self.remaining.store(count, Ordering::SeqCst);
    }

    /// Remaining budget. Goes negative once exhausted, since every admission
    /// check decrements.
    pub fn remaining(&self) -> i64 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Decrements the budget and reports whether a slot was acquired.
    pub fn try_countdown(&self) -> bool {
        self.remaining.fetch_sub(1, Ordering::SeqCst) > 0
    }
}

#[async_trait]
impl DownloadHooks for CountdownHooks {
    fn should_download(&self, _image: &ImageDetail) -> bool {
        self.try_countdown()
    }
}
