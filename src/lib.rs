//! 漫画下载器 - 按"本子 → 章节 → 图片"层级抓取远端漫画内容
//!
//! 这个crate提供漫画批量下载的核心功能：
//! 目录命名规则、下载编排与成功/失败记录。

/// 配置模块
pub mod config;

/// 远端API客户端
pub mod client;

/// 下载编排
pub mod downloader;

/// 内容实体
pub mod entity;

/// 实用函数和辅助工具
pub mod utils;

/// 错误类型和处理
pub mod error;

// 重新导出常用的类型
pub use client::{ComicClient, HttpComicClient};
pub use config::{DirRule, DownloadOption};
pub use downloader::{CountdownHooks, DefaultHooks, DownloadHooks, Downloader, DryRunHooks};
pub use entity::{AlbumDetail, ImageDetail, PhotoDetail};
pub use error::ComicDownloaderError;
