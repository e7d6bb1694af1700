//! 运行时构造参数及其构建器。

use std::path::PathBuf;

use crate::content_blocking::ContentBlockingSettings;

/// 把原始抗锯齿设置映射为引擎的 MSAA 倍数。
///
/// `0`（以及负值）关闭抗锯齿，`2` 映射为 4 倍，其余正值映射为 2 倍。
pub const fn msaa_level(raw: i32) -> u8 {
    match raw {
        i32::MIN..=0 => 0,
        2 => 4,
        _ => 2,
    }
}

/// 一次运行时构造所需的全部选项。
///
/// 字段只读公开；实例只能经由 [`RuntimeSettingsBuilder`] 产生。
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct RuntimeSettings {
    pub content_blocking: ContentBlockingSettings,
    pub crash_handler: Option<String>,
    pub display_density_override: Option<f32>,
    pub display_dpi_override: Option<u32>,
    pub screen_size_override: Option<(u32, u32)>,
    pub remote_debugging: bool,
    pub input_auto_zoom: bool,
    pub double_tap_zooming: bool,
    pub debug_logging: bool,
    pub console_output: bool,
    pub login_autofill: bool,
    pub config_file_path: Option<PathBuf>,
    pub use_max_screen_depth: bool,
    pub arguments: Vec<String>,
    pub about_config: bool,
    pub gl_msaa_level: u8,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            content_blocking: ContentBlockingSettings::default(),
            crash_handler: None,
            display_density_override: None,
            display_dpi_override: None,
            screen_size_override: None,
            remote_debugging: false,
            input_auto_zoom: true,
            double_tap_zooming: true,
            debug_logging: false,
            console_output: false,
            login_autofill: false,
            config_file_path: None,
            use_max_screen_depth: false,
            arguments: Vec::new(),
            about_config: false,
            gl_msaa_level: 0,
        }
    }
}

impl RuntimeSettings {
    pub fn builder() -> RuntimeSettingsBuilder {
        RuntimeSettingsBuilder::default()
    }
}

/// [`RuntimeSettings`] 的构建器，选项按调用顺序覆盖。
#[derive(Clone, Debug, Default)]
pub struct RuntimeSettingsBuilder {
    settings: RuntimeSettings,
}

impl RuntimeSettingsBuilder {
    pub fn with_content_blocking(mut self, content_blocking: ContentBlockingSettings) -> Self {
        self.settings.content_blocking = content_blocking;
        self
    }

    pub fn with_crash_handler(mut self, name: impl Into<String>) -> Self {
        self.settings.crash_handler = Some(name.into());
        self
    }

    pub fn with_display_density_override(mut self, density: f32) -> Self {
        self.settings.display_density_override = Some(density);
        self
    }

    pub fn with_display_dpi_override(mut self, dpi: u32) -> Self {
        self.settings.display_dpi_override = Some(dpi);
        self
    }

    pub fn with_screen_size_override(mut self, width: u32, height: u32) -> Self {
        self.settings.screen_size_override = Some((width, height));
        self
    }

    pub fn with_remote_debugging(mut self, enabled: bool) -> Self {
        self.settings.remote_debugging = enabled;
        self
    }

    pub fn with_input_auto_zoom(mut self, enabled: bool) -> Self {
        self.settings.input_auto_zoom = enabled;
        self
    }

    pub fn with_double_tap_zooming(mut self, enabled: bool) -> Self {
        self.settings.double_tap_zooming = enabled;
        self
    }

    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.settings.debug_logging = enabled;
        self
    }

    pub fn with_console_output(mut self, enabled: bool) -> Self {
        self.settings.console_output = enabled;
        self
    }

    pub fn with_login_autofill(mut self, enabled: bool) -> Self {
        self.settings.login_autofill = enabled;
        self
    }

    pub fn with_config_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.config_file_path = Some(path.into());
        self
    }

    pub fn with_use_max_screen_depth(mut self, enabled: bool) -> Self {
        self.settings.use_max_screen_depth = enabled;
        self
    }

    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_about_config(mut self, enabled: bool) -> Self {
        self.settings.about_config = enabled;
        self
    }

    /// 按原始设置值写入 MSAA 倍数，映射规则见 [`msaa_level`]。
    pub fn with_msaa(mut self, raw: i32) -> Self {
        self.settings.gl_msaa_level = msaa_level(raw);
        self
    }

    pub fn build(self) -> RuntimeSettings {
        self.settings
    }
}
