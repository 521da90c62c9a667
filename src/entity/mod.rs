//! Album / photo / image detail entities.
//!
//! These are plain data structures describing the depth-3 content tree the
//! downloader walks. The HTTP client parses them from the remote JSON API and
//! tests build them directly.

use serde::{Deserialize, Serialize};

/// Album detail: the root of the content tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlbumDetail {
    /// 本子ID
    pub album_id: String,

    /// 本子名称
    #[serde(default)]
    pub name: String,

    /// 作者
    #[serde(default)]
    pub author: String,

    /// 章节列表
    #[serde(default)]
    pub photos: Vec<PhotoDetail>,

    /// 为true时跳过整个本子的下载
    #[serde(default)]
    pub skip: bool,
}

impl AlbumDetail {
    /// Number of photos in this album.
    pub fn len(&self) -> usize {
        self.photos.len()
    }

    /// Whether this album has no photos.
    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

/// Photo (chapter) detail: the middle level of the tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotoDetail {
    /// 章节ID
    pub photo_id: String,

    /// 章节名称
    #[serde(default)]
    pub name: String,

    /// 章节在本子中的序号（从1开始）
    #[serde(default)]
    pub index: usize,

    /// 所属本子的ID
    #[serde(default)]
    pub from_album: Option<String>,

    /// 图片列表
    #[serde(default)]
    pub images: Vec<ImageDetail>,

    /// 为true时跳过整个章节的下载
    #[serde(default)]
    pub skip: bool,
}

impl PhotoDetail {
    /// Number of images in this photo.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether this photo has no images.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Image detail: a single downloadable leaf.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageDetail {
    /// 图片文件名（不含后缀），例如 "00001"
    pub img_file_name: String,

    /// 图片后缀，例如 ".jpg"
    #[serde(default)]
    pub img_file_suffix: String,

    /// 图片下载地址
    #[serde(default)]
    pub download_url: String,

    /// 所属章节的ID
    #[serde(default)]
    pub from_photo: Option<String>,

    /// 为true时跳过这张图片的下载
    #[serde(default)]
    pub skip: bool,
}

impl ImageDetail {
    /// Full file name, e.g. `00001.jpg`. An explicit suffix argument overrides
    /// the image's own suffix (used for format conversion via config).
    pub fn filename(&self, suffix: Option<&str>) -> String {
        format!(
            "{}{}",
            self.img_file_name,
            suffix.unwrap_or(&self.img_file_suffix)
        )
    }
}
