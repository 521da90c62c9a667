//! Download orchestration.
//!
//! [`Downloader`] walks the album → photo → image tree, brackets each level
//! with before/after hooks that maintain the [`DownloadTracker`], and
//! dispatches children either sequentially or through a bounded worker pool
//! depending on the per-level batch threshold. Worker errors are captured in
//! the tracker instead of aborting siblings; `raise_if_has_exception` turns
//! them into one aggregate error at the end.

pub mod hooks;
pub mod tracker;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::client::ComicClient;
use crate::config::DownloadOption;
use crate::entity::{AlbumDetail, ImageDetail, PhotoDetail};
use crate::error::{ComicDownloaderError, Result};
use crate::utils::file;

pub use hooks::{CountdownHooks, DefaultHooks, DownloadHooks, DryRunHooks};
pub use tracker::DownloadTracker;

/// Cheap-to-clone handle over the shared state of one download run.
/// Clones sent into worker tasks report into the same tracker.
#[derive(Clone)]
pub struct Downloader {
    option: Arc<DownloadOption>,
    client: Arc<dyn ComicClient>,
    hooks: Arc<dyn DownloadHooks>,
    tracker: Arc<DownloadTracker>,
}

impl Downloader {
    /// Creates a downloader with the standard HTTP client and default policy.
    pub fn new(option: DownloadOption) -> Self {
        let client: Arc<dyn ComicClient> = Arc::new(option.new_client());
        Self {
            option: Arc::new(option),
            client,
            hooks: Arc::new(DefaultHooks),
            tracker: Arc::new(DownloadTracker::new()),
        }
    }

    /// Replaces the client (tests use an in-memory stub).
    pub fn with_client(mut self, client: Arc<dyn ComicClient>) -> Self {
        self.client = client;
        self
    }

    /// Replaces the download policy.
    pub fn with_hooks(mut self, hooks: Arc<dyn DownloadHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// The option this downloader runs with.
    pub fn option(&self) -> &DownloadOption {
        &self.option
    }

    /// The bookkeeping of this run.
    pub fn tracker(&self) -> &DownloadTracker {
        &self.tracker
    }

    /// Fetches an album by id and downloads it.
    pub async fn download_album(&self, album_id: &str) -> Result<AlbumDetail> {
        let album = self.client.get_album_detail(album_id).await?;
        self.download_by_album_detail(&album).await?;
        Ok(album)
    }

    /// Fetches a photo by id and downloads it.
    pub async fn download_photo(&self, photo_id: &str) -> Result<PhotoDetail> {
        let photo = self.client.get_photo_detail(photo_id).await?;
        self.download_by_photo_detail(&photo).await?;
        Ok(photo)
    }

    /// Downloads all photos of an already-fetched album.
    pub async fn download_by_album_detail(&self, album: &AlbumDetail) -> Result<()> {
        if album.skip {
            info!("Album {} is marked skip, not downloading", album.album_id);
            return Ok(());
        }

        let mut album = self.hooks.filter_album(album.clone());
        for photo in album.photos.iter_mut() {
            if photo.from_album.is_none() {
                photo.from_album = Some(album.album_id.clone());
            }
        }

        self.before_album(&album);

        let batch = self.option.download.threading.photo;
        let op = {
            let downloader = self.clone();
            let album = Arc::new(album.clone());
            move |photo: PhotoDetail| {
                let downloader = downloader.clone();
                let album = Arc::clone(&album);
                async move {
                    let snapshot = photo.clone();
                    if let Err(e) = downloader.download_photo_in_album(&album, photo).await {
                        warn!("Photo {} download failed: {}", snapshot.photo_id, e);
                        downloader.tracker.record_photo_failure(snapshot, e);
                    }
                }
            }
        };
        self.execute_on_condition(album.photos.clone(), op, batch)
            .await;

        self.after_album(&album);
        Ok(())
    }

    /// Downloads all images of an already-fetched photo. The album context is
    /// derived from `from_album`; a photo without one tracks under itself.
    pub async fn download_by_photo_detail(&self, photo: &PhotoDetail) -> Result<()> {
        let album = self.album_context(photo).await;
        self.download_photo_in_album(&album, photo.clone()).await
    }

    async fn download_photo_in_album(
        &self,
        album: &AlbumDetail,
        photo: PhotoDetail,
    ) -> Result<()> {
        if photo.skip {
            info!("Photo {} is marked skip, not downloading", photo.photo_id);
            return Ok(());
        }

        let mut photo = photo;
        if photo.images.is_empty() {
            // Album listings may carry photo stubs without their image list.
            let fetched = self.client.get_photo_detail(&photo.photo_id).await?;
            photo.images = fetched.images;
            if photo.name.is_empty() {
                photo.name = fetched.name;
            }
        }

        let mut photo = self.hooks.filter_photo(photo);
        if photo.from_album.is_none() {
            photo.from_album = Some(album.album_id.clone());
        }
        for image in photo.images.iter_mut() {
            if image.from_photo.is_none() {
                image.from_photo = Some(photo.photo_id.clone());
            }
        }

        self.before_photo(&photo);

        let batch = self.option.download.threading.image;
        let op = {
            let downloader = self.clone();
            let album = Arc::new(album.clone());
            let photo = Arc::new(photo.clone());
            move |image: ImageDetail| {
                let downloader = downloader.clone();
                let album = Arc::clone(&album);
                let photo = Arc::clone(&photo);
                async move {
                    let snapshot = image.clone();
                    if let Err(e) = downloader
                        .download_by_image_detail(&album, &photo, &image)
                        .await
                    {
                        warn!(
                            "Image {} download failed: {}",
                            snapshot.filename(None),
                            e
                        );
                        downloader.tracker.record_image_failure(snapshot, e);
                    }
                }
            }
        };
        self.execute_on_condition(photo.images.clone(), op, batch)
            .await;

        self.after_photo(&photo);
        Ok(())
    }

    /// Downloads a single image: decides the save path, honors the skip flag,
    /// the policy admission check and the cache, then saves and records it.
    pub async fn download_by_image_detail(
        &self,
        album: &AlbumDetail,
        photo: &PhotoDetail,
        image: &ImageDetail,
    ) -> Result<()> {
        let mut image = image.clone();
        if image.from_photo.is_none() {
            image.from_photo = Some(photo.photo_id.clone());
        }

        let save_path = self.option.decide_image_filepath(album, photo, &image)?;
        self.before_image(&image, &save_path);

        if image.skip {
            debug!("Image {} is marked skip", image.filename(None));
            return Ok(());
        }

        if !self.hooks.should_download(&image) {
            debug!("Download budget exhausted, skipping {}", image.filename(None));
            return Ok(());
        }

        if self.option.download.cache && file::file_exists(&save_path) {
            debug!("Cache hit: {}", save_path.display());
            self.after_image(&image, &save_path);
            return Ok(());
        }

        self.hooks
            .save_image(self.client.as_ref(), &image, &save_path)
            .await?;
        self.after_image(&image, &save_path);
        Ok(())
    }

    /// Registers an album in the tracker before its photos are dispatched.
    pub fn before_album(&self, album: &AlbumDetail) {
        info!(
            "Album start: [{}] {} ({} photos)",
            album.album_id,
            album.name,
            album.len()
        );
        self.tracker.begin_album(album, album.len());
    }

    /// Bracket hook after an album's photos finished.
    pub fn after_album(&self, album: &AlbumDetail) {
        info!("Album done: [{}] {}", album.album_id, album.name);
    }

    /// Registers a photo (and, if needed, its album) before image dispatch.
    pub fn before_photo(&self, photo: &PhotoDetail) {
        debug!(
            "Photo start: [{}] {} ({} images)",
            photo.photo_id,
            photo.name,
            photo.len()
        );
        let album_key = photo
            .from_album
            .clone()
            .unwrap_or_else(|| photo.photo_id.clone());
        self.tracker.begin_photo(&album_key, photo, photo.len());
    }

    /// Bracket hook after a photo's images finished.
    pub fn after_photo(&self, photo: &PhotoDetail) {
        debug!("Photo done: [{}] {}", photo.photo_id, photo.name);
    }

    /// Bracket hook before one image transfer.
    pub fn before_image(&self, image: &ImageDetail, save_path: &Path) {
        debug!(
            "Image start: {} -> {}",
            image.filename(None),
            save_path.display()
        );
    }

    /// Records one saved image in the tracker. An image that was never linked
    /// to a photo tracks under its own file name.
    pub fn after_image(&self, image: &ImageDetail, save_path: &Path) {
        let photo_key = image
            .from_photo
            .clone()
            .unwrap_or_else(|| image.filename(None));
        self.tracker
            .record_image(&photo_key, save_path.to_path_buf(), image.filename(None));
    }

    /// Runs `op` over `items`: sequentially when the collection fits in one
    /// batch, otherwise through spawned tasks bounded by a semaphore with
    /// `batch_threshold` permits. `op` is expected to capture its own failures.
    pub async fn execute_on_condition<T, F, Fut>(
        &self,
        items: Vec<T>,
        op: F,
        batch_threshold: usize,
    ) where
        T: Send + 'static,
        F: Fn(T) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if items.is_empty() {
            return;
        }

        if items.len() <= batch_threshold {
            for item in items {
                op(item).await;
            }
            return;
        }

        let semaphore = Arc::new(Semaphore::new(batch_threshold.max(1)));
        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            let semaphore = Arc::clone(&semaphore);
            let op = op.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                op(item).await;
            }));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Worker task failed: {}", e);
            }
        }
    }

    /// Whether any photo or image failed so far.
    pub fn has_download_failures(&self) -> bool {
        self.tracker.has_failures()
    }

    /// Whether everything attempted completed and nothing failed.
    pub fn all_success(&self) -> bool {
        self.tracker.all_success()
    }

    /// Raises one aggregate error when any failure list is non-empty.
    /// A pure read; safe to call repeatedly.
    pub fn raise_if_has_exception(&self) -> Result<()> {
        let photo_failures = self.tracker.photo_failures();
        let image_failures = self.tracker.image_failures();
        if photo_failures.is_empty() && image_failures.is_empty() {
            return Ok(());
        }

        let mut parts = Vec::new();
        if let Some((photo, message)) = photo_failures.first() {
            parts.push(format!(
                "{}个章节失败，第一个: [{}] {}",
                photo_failures.len(),
                photo.photo_id,
                message
            ));
        }
        if let Some((image, message)) = image_failures.first() {
            parts.push(format!(
                "{}张图片失败，第一张: [{}] {}",
                image_failures.len(),
                image.filename(None),
                message
            ));
        }
        Err(ComicDownloaderError::PartialDownloadFailed(parts.join("；")))
    }

    /// Scoped execution: awaits `fut`, logs any error, and returns it
    /// unchanged. Errors are reported, never suppressed.
    pub async fn scope<T, Fut>(&self, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match fut.await {
            Ok(value) => Ok(value),
            Err(e) => {
                error!("Download scope failed: {}", e);
                Err(e)
            }
        }
    }

    /// Resolves the album a standalone photo belongs to, so album-level
    /// directory-rule fields reflect the real album. Falls back to a record
    /// synthesized from the photo when the lookup fails or no album is linked.
    async fn album_context(&self, photo: &PhotoDetail) -> AlbumDetail {
        if let Some(album_id) = &photo.from_album {
            match self.client.get_album_detail(album_id).await {
                Ok(album) => return album,
                Err(e) => warn!(
                    "Album {} lookup failed, falling back to photo context: {}",
                    album_id, e
                ),
            }
        }
        AlbumDetail {
            album_id: photo
                .from_album
                .clone()
                .unwrap_or_else(|| photo.photo_id.clone()),
            name: photo.name.clone(),
            ..Default::default()
        }
    }
}
