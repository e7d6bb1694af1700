//! 全局日志订阅器安装。
//!
//! 组装 `registry + EnvFilter + fmt` 并注册为全局 `tracing` Subscriber。过滤规则读取
//! `RUST_LOG`，未设置或解析失败时回落到 [`DEFAULT_DIRECTIVE`]。

use std::sync::OnceLock;

use thiserror::Error;
use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

/// `RUST_LOG` 缺省时使用的过滤指令。
pub const DEFAULT_DIRECTIVE: &str = "info";

static INSTALLED: OnceLock<()> = OnceLock::new();

/// 安装日志订阅器可能出现的错误。
///
/// # 教案式说明
/// - **意图（Why）**：启动流程需要区分“本 crate 已安装过”和“宿主已经设置了其他 Subscriber”；
/// - **契约（What）**：所有变体实现 [`std::error::Error`]，可直接交给上层错误框架处理。
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("lumen logging is already installed")]
    AlreadyInstalled,
    #[error("a global tracing subscriber is already set")]
    SubscriberAlreadySet,
    #[error("failed to set the global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// 构造过滤器：优先 `RUST_LOG`，否则使用 [`DEFAULT_DIRECTIVE`]。
pub fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// 安装全局日志订阅器，进程内只允许成功一次。
pub fn install() -> Result<(), InstallError> {
    if INSTALLED.get().is_some() {
        return Err(InstallError::AlreadyInstalled);
    }
    if dispatcher::has_been_set() {
        return Err(InstallError::SubscriberAlreadySet);
    }

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter())
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;

    INSTALLED
        .set(())
        .map_err(|_| InstallError::AlreadyInstalled)
}
