//! Success/failure bookkeeping for a download run.
//!
//! Successes live in a nested map keyed by album id, then photo id, holding
//! the ordered `(save path, image name)` pairs actually written. Failures are
//! two ordered lists, one per tree level, capturing the entity together with
//! the error so the reconciliation step can report them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::entity::{AlbumDetail, ImageDetail, PhotoDetail};
use crate::error::ComicDownloaderError;

#[derive(Debug, Default)]
struct PhotoRecord {
    /// Image count this photo is expected to produce.
    expected: usize,
    /// `(save path, image file name)` per downloaded image, in completion order.
    images: Vec<(PathBuf, String)>,
}

#[derive(Debug, Default)]
struct AlbumRecord {
    /// Photo count this album is expected to produce; 0 means unknown
    /// (the album was registered implicitly through one of its photos).
    expected: usize,
    photos: HashMap<String, PhotoRecord>,
}

/// Shared bookkeeping; every method locks internally so worker tasks can
/// report through a plain `&self`.
#[derive(Debug, Default)]
pub struct DownloadTracker {
    success: Mutex<HashMap<String, AlbumRecord>>,
    /// photo id -> album id, filled when a photo is registered.
    photo_index: Mutex<HashMap<String, String>>,
    failed_images: Mutex<Vec<(ImageDetail, ComicDownloaderError)>>,
    failed_photos: Mutex<Vec<(PhotoDetail, ComicDownloaderError)>>,
}

impl DownloadTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an album with its expected photo count.
    pub fn begin_album(&self, album: &AlbumDetail, expected_photos: usize) {
        let mut success = self.success.lock().unwrap();
        let record = success.entry(album.album_id.clone()).or_default();
        record.expected = expected_photos;
    }

    /// Registers a photo under an album, creating the album record when the
    /// photo is downloaded standalone.
    pub fn begin_photo(&self, album_id: &str, photo: &PhotoDetail, expected_images: usize) {
        let mut success = self.success.lock().unwrap();
        let album = success.entry(album_id.to_string()).or_default();
        let record = album.photos.entry(photo.photo_id.clone()).or_default();
        record.expected = expected_images;

        self.photo_index
            .lock()
            .unwrap()
            .insert(photo.photo_id.clone(), album_id.to_string());
    }

    /// Records one successfully saved image under its photo.
    pub fn record_image(&self, photo_id: &str, save_path: PathBuf, image_name: String) {
        let album_id = self
            .photo_index
            .lock()
            .unwrap()
            .get(photo_id)
            .cloned()
            // a photo that was never registered tracks under itself
            .unwrap_or_else(|| photo_id.to_string());

        let mut success = self.success.lock().unwrap();
        let album = success.entry(album_id).or_default();
        let record = album.photos.entry(photo_id.to_string()).or_default();
        record.images.push((save_path, image_name));
    }

    /// Captures an image-level failure.
    pub fn record_image_failure(&self, image: ImageDetail, error: ComicDownloaderError) {
        self.failed_images.lock().unwrap().push((image, error));
    }

    /// Captures a photo-level failure.
    pub fn record_photo_failure(&self, photo: PhotoDetail, error: ComicDownloaderError) {
        self.failed_photos.lock().unwrap().push((photo, error));
    }

    /// Whether this album was registered.
    pub fn contains_album(&self, album_id: &str) -> bool {
        self.success.lock().unwrap().contains_key(album_id)
    }

    /// Whether this photo was registered under this album.
    pub fn contains_photo(&self, album_id: &str, photo_id: &str) -> bool {
        self.success
            .lock()
            .unwrap()
            .get(album_id)
            .is_some_and(|a| a.photos.contains_key(photo_id))
    }

    /// The `(save path, image name)` pairs recorded for one photo.
    pub fn images_of(&self, album_id: &str, photo_id: &str) -> Vec<(PathBuf, String)> {
        self.success
            .lock()
            .unwrap()
            .get(album_id)
            .and_then(|a| a.photos.get(photo_id))
            .map(|p| p.images.clone())
            .unwrap_or_default()
    }

    /// Number of registered albums.
    pub fn album_count(&self) -> usize {
        self.success.lock().unwrap().len()
    }

    /// Number of image-level failures.
    pub fn failed_image_count(&self) -> usize {
        self.failed_images.lock().unwrap().len()
    }

    /// Number of photo-level failures.
    pub fn failed_photo_count(&self) -> usize {
        self.failed_photos.lock().unwrap().len()
    }

    /// Image failures as `(entity, error message)` pairs, in capture order.
    pub fn image_failures(&self) -> Vec<(ImageDetail, String)> {
        self.failed_images
            .lock()
            .unwrap()
            .iter()
            .map(|(image, error)| (image.clone(), error.to_string()))
            .collect()
    }

    /// Photo failures as `(entity, error message)` pairs, in capture order.
    pub fn photo_failures(&self) -> Vec<(PhotoDetail, String)> {
        self.failed_photos
            .lock()
            .unwrap()
            .iter()
            .map(|(photo, error)| (photo.clone(), error.to_string()))
            .collect()
    }

    /// Whether any failure was captured.
    pub fn has_failures(&self) -> bool {
        self.failed_image_count() > 0 || self.failed_photo_count() > 0
    }

    /// True when nothing failed and every registered album/photo is complete
    /// against its expected count. Trivially true for a fresh tracker.
    pub fn all_success(&self) -> bool {
        if self.has_failures() {
            return false;
        }
        let success = self.success.lock().unwrap();
        for album in success.values() {
            if album.expected > 0 && album.photos.len() != album.expected {
                return false;
            }
            for photo in album.photos.values() {
                if photo.images.len() != photo.expected {
                    return false;
                }
            }
        }
        true
    }
}
