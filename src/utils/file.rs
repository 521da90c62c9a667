//! 文件操作工具

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::Result;

/// Characters that are invalid in file names on Windows (superset of Unix).
const INVALID_FILENAME_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// 如果目录不存在则创建目录
pub fn create_dir(dirname: &Path) -> Result<()> {
    if !dirname.exists() {
        fs::create_dir_all(dirname)?;
    }
    Ok(())
}

/// 删除文件
pub fn delete_file(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// 检查文件是否存在
pub fn file_exists(path: &Path) -> bool {
    path.exists()
}

/// 将字节写入文件，父目录不存在时先创建
pub fn save_bytes(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data)?;
    Ok(())
}

/// Replaces characters that are illegal in directory/file names and trims
/// trailing dots and spaces. An empty result falls back to `"untitled"`.
pub fn fix_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if INVALID_FILENAME_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = cleaned.trim().trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}
