//! Configuration management module

pub mod dir_rule;
pub mod option;

pub use dir_rule::{DirRule, RuleKind};
pub use option::{ClientConfig, DirRuleConfig, DownloadConfig, DownloadOption, ThreadingConfig};
