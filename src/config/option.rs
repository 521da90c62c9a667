//! 下载器配置
//!
//! `DownloadOption` 是整个下载流程的配置对象，对应一个YAML文件。
//! 用户配置与默认值做深度合并，旧版本的配置键会被自动改写。

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::client::HttpComicClient;
use crate::config::dir_rule::DirRule;
use crate::entity::{AlbumDetail, ImageDetail, PhotoDetail};
use crate::error::{ComicDownloaderError, Result};
use crate::utils::file::fix_filename;

/// 目录规则配置节
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirRuleConfig {
    /// 规则DSL，例如 "Bd_Aname_Pindex"
    pub rule: String,

    /// 保存根目录
    pub base_dir: String,

    /// 中文规范化目标（zh-cn / zh-tw）
    pub normalize_zh: Option<String>,
}

impl Default for DirRuleConfig {
    fn default() -> Self {
        Self {
            rule: "Bd_Ptitle".to_string(),
            base_dir: "./".to_string(),
            normalize_zh: None,
        }
    }
}

/// 各层级的批量阈值：子项数量超过阈值时启用工作池并发下载
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadingConfig {
    /// 图片层阈值
    pub image: usize,

    /// 章节层阈值
    pub photo: usize,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self { image: 30, photo: 8 }
    }
}

/// 下载行为配置节
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// 为true时已存在的文件不再重新下载
    pub cache: bool,

    /// 强制保存后缀（例如 ".png"），None 时使用图片原始后缀
    pub suffix: Option<String>,

    /// 并发阈值
    pub threading: ThreadingConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            cache: true,
            suffix: None,
            threading: ThreadingConfig::default(),
        }
    }
}

/// 客户端配置节
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 客户端实现标识（"api" / "html"）
    #[serde(rename = "impl")]
    pub impl_: String,

    /// 域名列表，按顺序尝试
    pub domains: Vec<String>,

    /// 所有域名都失败时的重试轮数
    pub retry_times: u32,

    /// 请求携带的cookies
    pub cookies: HashMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            impl_: "api".to_string(),
            domains: Vec::new(),
            retry_times: 5,
            cookies: HashMap::new(),
        }
    }
}

/// 下载器的顶层配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadOption {
    /// 配置文件版本
    pub version: String,

    /// 是否输出日志
    pub log: bool,

    /// 目录规则
    pub dir_rule: DirRuleConfig,

    /// 下载行为
    pub download: DownloadConfig,

    /// 客户端
    pub client: ClientConfig,

    /// 插件配置（原样保留，本crate不执行插件）
    pub plugins: serde_yaml::Mapping,

    /// 配置来源文件路径（不序列化）
    #[serde(skip)]
    pub filepath: Option<PathBuf>,
}

impl Default for DownloadOption {
    fn default() -> Self {
        Self {
            version: "2.1".to_string(),
            log: true,
            dir_rule: DirRuleConfig::default(),
            download: DownloadConfig::default(),
            client: ClientConfig::default(),
            plugins: serde_yaml::Mapping::new(),
            filepath: None,
        }
    }
}

impl DownloadOption {
    /// 从YAML文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut option = Self::from_yaml_str(&content)?;
        option.filepath = Some(path.to_path_buf());
        Ok(option)
    }

    /// 从YAML字符串构造配置
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let user: Value = serde_yaml::from_str(content)?;
        Self::construct(user)
    }

    /// 从部分配置构造：旧键改写后与默认配置做深度合并
    pub fn construct(mut user: Value) -> Result<Self> {
        Self::compatible_with_old_versions(&mut user);
        let mut base = serde_yaml::to_value(Self::default())?;
        merge_value(&mut base, user);
        Ok(serde_yaml::from_value(base)?)
    }

    /// 保存到构造时记录的文件路径
    pub fn to_file(&self) -> Result<()> {
        match &self.filepath {
            Some(path) => self.to_file_at(path),
            None => Err(ComicDownloaderError::ConfigError(
                "配置没有关联的文件路径".to_string(),
            )),
        }
    }

    /// 保存到指定的YAML文件
    pub fn to_file_at(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 把配置还原成YAML值
    pub fn deconstruct(&self) -> Result<Value> {
        Ok(serde_yaml::to_value(self)?)
    }

    /// 复制一份独立的配置
    pub fn copy_option(&self) -> Self {
        self.clone()
    }

    /// 合并新的cookies到客户端配置（同名覆盖，其余保留）
    pub fn update_cookies(&mut self, cookies: HashMap<String, String>) {
        self.client.cookies.extend(cookies);
    }

    /// Rewrites configuration keys from older file formats in place:
    /// `download.threading.batch_count` becomes `download.threading.image`,
    /// and the old top-level `plugin` key becomes `plugins`.
    pub fn compatible_with_old_versions(value: &mut Value) {
        let Some(root) = value.as_mapping_mut() else {
            return;
        };

        if let Some(threading) = root
            .get_mut("download")
            .and_then(Value::as_mapping_mut)
            .and_then(|d| d.get_mut("threading"))
            .and_then(Value::as_mapping_mut)
        {
            if let Some(batch_count) = threading.remove("batch_count") {
                threading.insert(Value::from("image"), batch_count);
            }
        }

        if let Some(plugin) = root.remove("plugin") {
            root.insert(Value::from("plugins"), plugin);
        }
    }

    /// 根据配置构建目录规则
    pub fn build_dir_rule(&self) -> Result<DirRule> {
        DirRule::new(
            &self.dir_rule.rule,
            &self.dir_rule.base_dir,
            self.dir_rule.normalize_zh.as_deref(),
        )
    }

    /// 决定一张图片的保存目录
    pub fn decide_image_save_dir(
        &self,
        album: &AlbumDetail,
        photo: &PhotoDetail,
    ) -> Result<PathBuf> {
        self.build_dir_rule()?.decide_image_save_dir(album, photo)
    }

    /// 决定一张图片的完整保存路径（目录规则 + 文件名 + 可选的后缀覆盖）
    pub fn decide_image_filepath(
        &self,
        album: &AlbumDetail,
        photo: &PhotoDetail,
        image: &ImageDetail,
    ) -> Result<PathBuf> {
        let dir = self.decide_image_save_dir(album, photo)?;
        let filename = fix_filename(&image.filename(self.download.suffix.as_deref()));
        Ok(dir.join(filename))
    }

    /// 创建一个新的HTTP客户端
    pub fn new_client(&self) -> HttpComicClient {
        HttpComicClient::new(self.client.clone())
    }
}

/// Deep merge: mappings merge recursively with `user` winning, everything else
/// is replaced by `user`.
fn merge_value(base: &mut Value, user: Value) {
    match (base, user) {
        (Value::Mapping(base_map), Value::Mapping(user_map)) => {
            for (key, user_value) in user_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => merge_value(base_value, user_value),
                    None => {
                        base_map.insert(key, user_value);
                    }
                }
            }
        }
        (base_slot, user_value) => *base_slot = user_value,
    }
}
