//! Remote API client.
//!
//! The downloader only depends on the [`ComicClient`] trait, so the wire
//! protocol stays swappable and tests can run against an in-memory stub.

pub mod http;

use async_trait::async_trait;
use bytes::Bytes;

use crate::entity::{AlbumDetail, ImageDetail, PhotoDetail};
use crate::error::Result;

pub use http::HttpComicClient;

/// Access to the remote album/photo/image hierarchy.
#[async_trait]
pub trait ComicClient: Send + Sync {
    /// Fetches an album with its photo list.
    async fn get_album_detail(&self, album_id: &str) -> Result<AlbumDetail>;

    /// Fetches a photo with its image list.
    async fn get_photo_detail(&self, photo_id: &str) -> Result<PhotoDetail>;

    /// Downloads the raw bytes of one image.
    async fn fetch_image_data(&self, image: &ImageDetail) -> Result<Bytes>;
}
