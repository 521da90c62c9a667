//! 漫画下载器的错误类型

use std::fmt;

/// 漫画下载器的自定义错误类型
#[derive(Debug)]
pub enum ComicDownloaderError {
    /// IO错误
    IoError(std::io::Error),

    /// HTTP错误
    HttpError(String),

    /// 配置错误
    ConfigError(String),

    /// 解析错误
    ParseError(String),

    /// 下载错误
    DownloadError(String),

    /// 部分下载失败（对账步骤抛出的汇总错误）
    PartialDownloadFailed(String),
}

impl fmt::Display for ComicDownloaderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ComicDownloaderError::IoError(e) => write!(f, "IO错误: {}", e),
            ComicDownloaderError::HttpError(e) => write!(f, "HTTP错误: {}", e),
            ComicDownloaderError::ConfigError(e) => write!(f, "配置错误: {}", e),
            ComicDownloaderError::ParseError(e) => write!(f, "解析错误: {}", e),
            ComicDownloaderError::DownloadError(e) => write!(f, "下载错误: {}", e),
            ComicDownloaderError::PartialDownloadFailed(e) => {
                write!(f, "部分下载失败: {}", e)
            }
        }
    }
}

impl std::error::Error for ComicDownloaderError {}

impl From<std::io::Error> for ComicDownloaderError {
    fn from(error: std::io::Error) -> Self {
        ComicDownloaderError::IoError(error)
    }
}

impl From<serde_yaml::Error> for ComicDownloaderError {
    fn from(error: serde_yaml::Error) -> Self {
        ComicDownloaderError::ConfigError(format!("YAML解析错误: {}", error))
    }
}

impl From<serde_json::Error> for ComicDownloaderError {
    fn from(error: serde_json::Error) -> Self {
        ComicDownloaderError::ParseError(format!("JSON解析错误: {}", error))
    }
}

impl From<reqwest::Error> for ComicDownloaderError {
    fn from(error: reqwest::Error) -> Self {
        ComicDownloaderError::HttpError(format!("HTTP请求错误: {}", error))
    }
}

impl From<tokio::task::JoinError> for ComicDownloaderError {
    fn from(error: tokio::task::JoinError) -> Self {
        ComicDownloaderError::DownloadError(format!("任务连接错误: {}", error))
    }
}
