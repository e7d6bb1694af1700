//! 引擎构造所处的宿主环境。

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::EngineError;
use crate::settings::{EngineSettings, SettingsSource};

/// 引擎配置文件在配置目录中的文件名。
pub const CONFIG_FILE_NAME: &str = "engine-config.yaml";

/// 宿主环境：设置来源、配置目录、崩溃处理器与构建类型。
///
/// # 契约说明（What）
/// - 设置只在运行时首次构造时经 [`EngineContext::settings`] 读取一次；
/// - 配置目录在 [`EngineContext::prepare_config_file_path`] 时按需创建。
#[derive(Clone)]
pub struct EngineContext {
    settings: Arc<dyn SettingsSource>,
    profile_dir: PathBuf,
    crash_handler: Option<String>,
    debug_build: bool,
}

impl EngineContext {
    pub fn new(profile_dir: impl Into<PathBuf>, settings: Arc<dyn SettingsSource>) -> Self {
        Self {
            settings,
            profile_dir: profile_dir.into(),
            crash_handler: None,
            debug_build: cfg!(debug_assertions),
        }
    }

    pub fn with_crash_handler(mut self, name: impl Into<String>) -> Self {
        self.crash_handler = Some(name.into());
        self
    }

    /// 覆盖构建类型；调试构建会额外开启 `about:config` 并追加 `-purgecaches` 启动参数。
    pub fn with_debug_build(mut self, debug_build: bool) -> Self {
        self.debug_build = debug_build;
        self
    }

    /// 读取当前设置。
    pub fn settings(&self) -> Result<EngineSettings, EngineError> {
        self.settings.load()
    }

    pub fn settings_source(&self) -> &dyn SettingsSource {
        &*self.settings
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    pub fn crash_handler(&self) -> Option<&str> {
        self.crash_handler.as_deref()
    }

    pub fn is_debug_build(&self) -> bool {
        self.debug_build
    }

    /// 确保配置目录存在并返回配置文件路径。
    pub fn prepare_config_file_path(&self) -> Result<PathBuf, EngineError> {
        fs::create_dir_all(&self.profile_dir)
            .map_err(|error| EngineError::io(&self.profile_dir, error))?;
        Ok(self.profile_dir.join(CONFIG_FILE_NAME))
    }
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext")
            .field("settings", &self.settings.describe())
            .field("profile_dir", &self.profile_dir)
            .field("crash_handler", &self.crash_handler)
            .field("debug_build", &self.debug_build)
            .finish()
    }
}
