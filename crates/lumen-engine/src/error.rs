//! 引擎资源生命周期的错误类型。

use std::borrow::Cow;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 引擎运行时与客户端构造过程中的错误。
///
/// # 教案式说明
/// - **意图（Why）**：构造失败不会写入懒加载槽位，调用方需要据此区分“可以重试”的失败
///   与“调用顺序错误”（[`EngineError::RuntimeNotInitialized`]）；
/// - **契约（What）**：`Settings` 携带配置来源描述，便于定位是哪个文件或内存来源出错。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("engine runtime has not been initialized")]
    RuntimeNotInitialized,
    #[error("invalid engine settings from {source_name}: {reason}")]
    Settings {
        source_name: Cow<'static, str>,
        reason: String,
    },
    #[error("engine profile i/o failed at {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("engine construction failed: {0}")]
    Construction(String),
}

impl EngineError {
    pub(crate) fn settings(
        source_name: impl Into<Cow<'static, str>>,
        reason: impl ToString,
    ) -> Self {
        EngineError::Settings {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            error,
        }
    }

    /// 以文本描述构造失败，供 [`EngineFactory`](crate::EngineFactory) 实现使用。
    pub fn construction(reason: impl Into<String>) -> Self {
        EngineError::Construction(reason.into())
    }
}
