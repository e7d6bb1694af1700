#![deny(unsafe_code)]
#![doc = "lumen-engine: 进程级共享引擎运行时与客户端的懒加载提供者。"]
#![doc = ""]
#![doc = "== 能力概览 =="]
#![doc = "1. [`EngineProvider`]：双重检查的运行时/客户端槽位，保证恰好构造一次。"]
#![doc = "2. [`RuntimeSettingsBuilder`]：把应用设置翻译为运行时构造参数，"]
#![doc = "   涵盖内容拦截、显示覆盖、功能开关与 MSAA。"]
#![doc = "3. [`SettingsSource`]：设置来源，内置内存来源与 TOML 文件来源。"]
#![doc = ""]
#![doc = "真实引擎通过 [`EngineFactory`] 与 [`EngineRuntime`] 接入。"]

mod content_blocking;
mod context;
mod error;
mod factory;
mod provider;
mod runtime_settings;
mod settings;
mod slot;

pub use content_blocking::{
    AntiTracking, ContentBlockingSettings, CookieBehavior, EtpLevel, TrackingProtectionPolicy,
};
pub use context::{CONFIG_FILE_NAME, EngineContext};
pub use error::EngineError;
pub use factory::{EngineFactory, EngineRuntime};
pub use provider::{ClientOf, DEBUG_ARGUMENTS, EngineProvider, build_runtime_settings};
pub use runtime_settings::{RuntimeSettings, RuntimeSettingsBuilder, msaa_level};
pub use settings::{EngineSettings, SettingsSource, TomlSettingsSource};
pub use slot::LazySlot;
