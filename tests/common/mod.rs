//! Shared fixtures: an in-memory stub client and option builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;

use comic_downloader::error::Result;
use comic_downloader::{
    AlbumDetail, ComicClient, ComicDownloaderError, DownloadOption, ImageDetail, PhotoDetail,
};

/// Bytes the stub serves for every image.
pub const STUB_IMAGE_DATA: &[u8] = b"stub-image-bytes";

/// In-memory `ComicClient` carrying pre-built details.
pub struct StubClient {
    albums: HashMap<String, AlbumDetail>,
    photos: HashMap<String, PhotoDetail>,
    /// `img_file_name` values whose byte fetch fails.
    fail_images: Vec<String>,
}

impl StubClient {
    /// Builds a stub serving one album and all of its photos.
    pub fn with_album(album: AlbumDetail) -> Self {
        let mut albums = HashMap::new();
        let mut photos = HashMap::new();
        for photo in &album.photos {
            photos.insert(photo.photo_id.clone(), photo.clone());
        }
        albums.insert(album.album_id.clone(), album);
        Self {
            albums,
            photos,
            fail_images: Vec::new(),
        }
    }

    /// Marks image names whose data fetch should fail.
    pub fn failing_images(mut self, names: &[&str]) -> Self {
        self.fail_images = names.iter().map(|s| s.to_string()).collect();
        self
    }
}

#[async_trait]
impl ComicClient for StubClient {
    async fn get_album_detail(&self, album_id: &str) -> Result<AlbumDetail> {
        self.albums.get(album_id).cloned().ok_or_else(|| {
            ComicDownloaderError::DownloadError(format!("no such album: {}", album_id))
        })
    }

    async fn get_photo_detail(&self, photo_id: &str) -> Result<PhotoDetail> {
        self.photos.get(photo_id).cloned().ok_or_else(|| {
            ComicDownloaderError::DownloadError(format!("no such photo: {}", photo_id))
        })
    }

    async fn fetch_image_data(&self, image: &ImageDetail) -> Result<Bytes> {
        if self.fail_images.contains(&image.img_file_name) {
            return Err(ComicDownloaderError::HttpError(format!(
                "stub failure for {}",
                image.img_file_name
            )));
        }
        Ok(Bytes::from_static(STUB_IMAGE_DATA))
    }
}

/// Builds an album with fully linked photos and images.
pub fn sample_album(album_id: &str, photo_count: usize, images_per_photo: usize) -> AlbumDetail {
    let photos = (1..=photo_count)
        .map(|p| {
            let photo_id = format!("{}-{}", album_id, p);
            let images = (1..=images_per_photo)
                .map(|i| ImageDetail {
                    img_file_name: format!("{:05}", i),
                    img_file_suffix: ".jpg".to_string(),
                    download_url: format!("https://img.example.com/{}/{}", photo_id, i),
                    from_photo: Some(photo_id.clone()),
                    skip: false,
                })
                .collect();
            PhotoDetail {
                photo_id,
                name: format!("第{}话", p),
                index: p,
                from_album: Some(album_id.to_string()),
                images,
                skip: false,
            }
        })
        .collect();

    AlbumDetail {
        album_id: album_id.to_string(),
        name: "测试本子".to_string(),
        author: "author".to_string(),
        photos,
        skip: false,
    }
}

/// Option rooted at a temp directory, with caching off so tests re-download.
pub fn test_option(base_dir: &Path) -> DownloadOption {
    let mut option = DownloadOption::default();
    option.dir_rule.rule = "Bd_Aid_Pid".to_string();
    option.dir_rule.base_dir = base_dir.to_string_lossy().into_owned();
    option.download.cache = false;
    option
}
