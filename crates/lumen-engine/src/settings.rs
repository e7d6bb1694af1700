//! 应用持久化设置及其来源。
//!
//! # 契约说明（What）
//! - [`EngineSettings`] 是构造运行时所需的全部输入，缺省字段取默认值，未知字段被拒绝；
//! - [`SettingsSource`] 在运行时首次构造时被读取一次，之后不会再被访问。

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::content_blocking::EtpLevel;
use crate::error::EngineError;

/// 引擎构造时读取的应用设置。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    pub etp_level: EtpLevel,
    pub display_density: f32,
    pub display_dpi: u32,
    pub max_window_width: u32,
    pub max_window_height: u32,
    pub remote_debugging: bool,
    pub debug_logging: bool,
    pub login_autofill: bool,
    /// 窗口透明边框宽度；大于 0 时引擎需使用最大屏幕色深。
    pub transparent_border_width: u32,
    /// 原始抗锯齿设置，经 [`msaa_level`](crate::msaa_level) 映射后生效。
    pub msaa: i32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            etp_level: EtpLevel::default(),
            display_density: 1.0,
            display_dpi: 320,
            max_window_width: 3840,
            max_window_height: 2160,
            remote_debugging: false,
            debug_logging: false,
            login_autofill: true,
            transparent_border_width: 0,
            msaa: 1,
        }
    }
}

impl EngineSettings {
    /// 从 TOML 文本解析设置。
    pub fn from_toml_str(raw: &str) -> Result<Self, EngineError> {
        toml::from_str(raw).map_err(|error| EngineError::settings("inline toml", error))
    }
}

/// 设置来源。
pub trait SettingsSource: Send + Sync {
    /// 读取当前设置。
    fn load(&self) -> Result<EngineSettings, EngineError>;

    /// 来源描述，用于日志与错误信息。
    fn describe(&self) -> Cow<'_, str> {
        Cow::Borrowed("settings")
    }
}

impl SettingsSource for EngineSettings {
    fn load(&self) -> Result<EngineSettings, EngineError> {
        Ok(self.clone())
    }

    fn describe(&self) -> Cow<'_, str> {
        Cow::Borrowed("in-memory settings")
    }
}

/// 从 TOML 文件读取设置。
#[derive(Clone)]
pub struct TomlSettingsSource {
    path: PathBuf,
}

impl TomlSettingsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for TomlSettingsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TomlSettingsSource")
            .field(&self.path.display())
            .finish()
    }
}

impl SettingsSource for TomlSettingsSource {
    fn load(&self) -> Result<EngineSettings, EngineError> {
        let raw =
            fs::read_to_string(&self.path).map_err(|error| EngineError::io(&self.path, error))?;
        let settings = toml::from_str(&raw)
            .map_err(|error| EngineError::settings(self.path.display().to_string(), error))?;
        debug!(path = %self.path.display(), "engine settings loaded");
        Ok(settings)
    }

    fn describe(&self) -> Cow<'_, str> {
        Cow::Owned(self.path.display().to_string())
    }
}
