//! HTTP client implementation

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::client::ComicClient;
use crate::config::option::ClientConfig;
use crate::entity::{AlbumDetail, ImageDetail, PhotoDetail};
use crate::error::{ComicDownloaderError, Result};

/// HTTP comic client backed by a JSON detail API.
///
/// Detail requests rotate over the configured domain list; a full round of
/// failures is retried `retry_times` times before giving up.
pub struct HttpComicClient {
    client: Client,
    config: ClientConfig,
}

impl HttpComicClient {
    /// Creates a new HTTP client from the client config section.
    pub fn new(config: ClientConfig) -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36")
            .build()
            .expect("Failed to build HTTP client");
        Self { client, config }
    }

    /// Domains configured for this client.
    pub fn domain_list(&self) -> &[String] {
        &self.config.domains
    }

    fn cookie_header(&self) -> Option<String> {
        if self.config.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .config
            .cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        Some(pairs.join("; "))
    }

    /// Requests `path` from each configured domain in order, retrying the
    /// whole rotation `retry_times` times.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        if self.config.domains.is_empty() {
            return Err(ComicDownloaderError::ConfigError(
                "客户端没有配置任何域名".to_string(),
            ));
        }

        let mut last_error = None;
        for round in 0..self.config.retry_times.max(1) {
            for domain in &self.config.domains {
                let url = format!("https://{}/{}", domain, path);
                match self.request_json::<T>(&url).await {
                    Ok(value) => return Ok(value),
                    Err(e) => {
                        warn!("Request to {} failed (round {}): {}", url, round + 1, e);
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ComicDownloaderError::HttpError("所有域名都请求失败".to_string())
        }))
    }

    async fn request_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut request = self.client.get(url);
        if let Some(cookie) = self.cookie_header() {
            request = request.header("Cookie", cookie);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ComicDownloaderError::HttpError(format!(
                "HTTP request failed with status: {}",
                status
            )));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ComicClient for HttpComicClient {
    async fn get_album_detail(&self, album_id: &str) -> Result<AlbumDetail> {
        debug!("Fetching album detail: {}", album_id);
        let mut album: AlbumDetail = self.get_json(&format!("album/{}", album_id)).await?;

        // Backfill tree links and 1-based indices the API may omit.
        for (i, photo) in album.photos.iter_mut().enumerate() {
            if photo.from_album.is_none() {
                photo.from_album = Some(album.album_id.clone());
            }
            if photo.index == 0 {
                photo.index = i + 1;
            }
            for image in photo.images.iter_mut() {
                if image.from_photo.is_none() {
                    image.from_photo = Some(photo.photo_id.clone());
                }
            }
        }
        Ok(album)
    }

    async fn get_photo_detail(&self, photo_id: &str) -> Result<PhotoDetail> {
        debug!("Fetching photo detail: {}", photo_id);
        let mut photo: PhotoDetail = self.get_json(&format!("photo/{}", photo_id)).await?;
        for image in photo.images.iter_mut() {
            if image.from_photo.is_none() {
                image.from_photo = Some(photo.photo_id.clone());
            }
        }
        Ok(photo)
    }

    /// Streams one image body into memory, with a progress bar.
    async fn fetch_image_data(&self, image: &ImageDetail) -> Result<Bytes> {
        let mut request = self.client.get(&image.download_url);
        if let Some(cookie) = self.cookie_header() {
            request = request.header("Cookie", cookie);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ComicDownloaderError::HttpError(format!(
                "HTTP request failed with status: {}",
                status
            )));
        }

        let total_size = response.content_length().unwrap_or(0);
        let pb = ProgressBar::new(total_size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
                .unwrap()
                .progress_chars("#>-"),
        );

        let mut stream = response.bytes_stream();
        let mut downloaded_data = Vec::with_capacity(total_size as usize);

        while let Some(item) = stream.next().await {
            let chunk = item?;
            downloaded_data.extend_from_slice(&chunk);
            pb.inc(chunk.len() as u64);
        }

        if total_size > 0 && downloaded_data.len() as u64 != total_size {
            pb.finish_with_message("Error: Incomplete image download.");
            return Err(ComicDownloaderError::HttpError(format!(
                "Did not receive the expected amount of data for {}. Expected: {} bytes, Received: {} bytes.",
                image.filename(None),
                total_size,
                downloaded_data.len()
            )));
        }

        pb.finish_with_message("Image download complete");
        Ok(Bytes::from(downloaded_data))
    }
}

impl Clone for HttpComicClient {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone(),
        }
    }
}
