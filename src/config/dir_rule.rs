//! Directory rule DSL.
//!
//! A rule string such as `Bd_Aid_Pname` describes where downloaded images are
//! saved: each token becomes one path segment. `Bd` is the configured base
//! directory, `A`-prefixed tokens read album fields, `P`-prefixed tokens read
//! photo fields, and tokens containing `{` are format strings interpolating any
//! property name, e.g. `{Aid}_{Pname}`.

use std::path::{Path, PathBuf};

use crate::entity::{AlbumDetail, PhotoDetail};
use crate::error::{ComicDownloaderError, Result};
use crate::utils::file::fix_filename;

/// Supported values for the `normalize_zh` setting.
const NORMALIZE_ZH_VALUES: [&str; 2] = ["zh-cn", "zh-tw"];

/// What a single rule token resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// The configured base directory (`Bd`).
    BaseDir,
    /// An album field (`Aid`, `Aname`, `Atitle`, `Aauthor`).
    AlbumField,
    /// A photo field (`Pid`, `Pname`, `Ptitle`, `Pindex`).
    PhotoField,
    /// A format string with `{Property}` placeholders.
    Format,
}

/// Maps album/photo details to save directories according to a rule DSL.
#[derive(Debug, Clone)]
pub struct DirRule {
    /// The raw rule string.
    pub rule_dsl: String,
    /// Base directory every path starts from.
    pub base_dir: PathBuf,
    /// Chinese script normalization target, `zh-cn` or `zh-tw`.
    pub normalize_zh: Option<String>,
}

impl DirRule {
    /// Creates a rule, validating `normalize_zh` when present.
    pub fn new(
        rule_dsl: &str,
        base_dir: impl Into<PathBuf>,
        normalize_zh: Option<&str>,
    ) -> Result<Self> {
        if let Some(value) = normalize_zh {
            if !NORMALIZE_ZH_VALUES.contains(&value) {
                return Err(ComicDownloaderError::ConfigError(format!(
                    "无效的 normalize_zh 值: {}（支持 zh-cn / zh-tw）",
                    value
                )));
            }
        }
        Ok(Self {
            rule_dsl: rule_dsl.to_string(),
            base_dir: base_dir.into(),
            normalize_zh: normalize_zh.map(str::to_string),
        })
    }

    /// Splits a rule DSL into tokens. `/` is the separator when present,
    /// otherwise `_` (which allows format tokens containing `_` only in the
    /// `/` form). A missing leading `Bd` is inserted.
    pub fn split_rule_dsl(dsl: &str) -> Vec<String> {
        let sep = if dsl.contains('/') { '/' } else { '_' };
        let mut tokens: Vec<String> = dsl
            .split(sep)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if tokens.first().map(String::as_str) != Some("Bd") {
            tokens.insert(0, "Bd".to_string());
        }
        tokens
    }

    /// Classifies a single token.
    pub fn rule_kind(token: &str) -> Result<RuleKind> {
        if token.contains('{') {
            Ok(RuleKind::Format)
        } else if token == "Bd" {
            Ok(RuleKind::BaseDir)
        } else if token.starts_with('A') {
            Ok(RuleKind::AlbumField)
        } else if token.starts_with('P') {
            Ok(RuleKind::PhotoField)
        } else {
            Err(ComicDownloaderError::ConfigError(format!(
                "无效的目录规则: {}",
                token
            )))
        }
    }

    /// Applies one token to the given album/photo, returning a sanitized path
    /// segment. `Bd` resolves to the base directory.
    pub fn apply_rule_to_filename(
        &self,
        album: &AlbumDetail,
        photo: &PhotoDetail,
        token: &str,
    ) -> Result<String> {
        match Self::rule_kind(token)? {
            RuleKind::BaseDir => Ok(self.base_dir.to_string_lossy().into_owned()),
            RuleKind::Format => Ok(fix_filename(&interpolate(album, photo, token)?)),
            RuleKind::AlbumField | RuleKind::PhotoField => {
                Ok(fix_filename(&resolve_property(album, photo, token)?))
            }
        }
    }

    /// Decides the directory a photo's images are saved into.
    pub fn decide_image_save_dir(
        &self,
        album: &AlbumDetail,
        photo: &PhotoDetail,
    ) -> Result<PathBuf> {
        let mut path = PathBuf::new();
        for token in Self::split_rule_dsl(&self.rule_dsl) {
            match Self::rule_kind(&token)? {
                RuleKind::BaseDir => path.push(&self.base_dir),
                _ => path.push(self.apply_rule_to_filename(album, photo, &token)?),
            }
        }
        Ok(path)
    }

    /// Decides the album's root directory: only tokens that do not reference
    /// photo fields are applied.
    pub fn decide_album_root_dir(&self, album: &AlbumDetail) -> Result<PathBuf> {
        let placeholder_photo = PhotoDetail::default();
        let mut path = PathBuf::new();
        for token in Self::split_rule_dsl(&self.rule_dsl) {
            match Self::rule_kind(&token)? {
                RuleKind::BaseDir => path.push(&self.base_dir),
                RuleKind::PhotoField => {}
                RuleKind::Format => {
                    if !token_mentions_photo(&token) {
                        path.push(self.apply_rule_to_filename(album, &placeholder_photo, &token)?);
                    }
                }
                RuleKind::AlbumField => {
                    path.push(self.apply_rule_to_filename(album, &placeholder_photo, &token)?);
                }
            }
        }
        Ok(path)
    }

    /// Base directory as a `Path`.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// Resolves a property name against the album/photo pair.
fn resolve_property(album: &AlbumDetail, photo: &PhotoDetail, name: &str) -> Result<String> {
    match name {
        "Aid" => Ok(album.album_id.clone()),
        "Aname" | "Atitle" => Ok(album.name.clone()),
        "Aauthor" => Ok(album.author.clone()),
        "Pid" => Ok(photo.photo_id.clone()),
        "Pname" | "Ptitle" => Ok(photo.name.clone()),
        "Pindex" => Ok(photo.index.to_string()),
        _ => Err(ComicDownloaderError::ConfigError(format!(
            "无效的规则属性: {}",
            name
        ))),
    }
}

/// Interpolates `{Property}` placeholders in a format token.
fn interpolate(album: &AlbumDetail, photo: &PhotoDetail, token: &str) -> Result<String> {
    let mut out = String::new();
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c != '{' {
            out.push(c);
            continue;
        }
        let mut name = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(ch) => name.push(ch),
                None => {
                    return Err(ComicDownloaderError::ConfigError(format!(
                        "规则中存在未闭合的大括号: {}",
                        token
                    )))
                }
            }
        }
        out.push_str(&resolve_property(album, photo, &name)?);
    }
    Ok(out)
}

/// Whether a format token references any photo property.
fn token_mentions_photo(token: &str) -> bool {
    let mut rest = token;
    while let Some(start) = rest.find('{') {
        rest = &rest[start + 1..];
        if rest.starts_with('P') {
            return true;
        }
    }
    false
}
