//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为 [`AsyncResult`](crate::AsyncResult) 的失败分支提供统一载体，保证同一错误在多个观察者之间
//!   共享同一份实例，调用方可以用 [`ResultError::same_as`] 验证“原样转发”；
//! - 区分“失败结果”（[`ResultError`]）与“状态违例”（[`CompletionError`]），后者只会返回给试图
//!   重复完成结果的一方，永远不会投递给观察者。
//!
//! ## 设计要求（What）
//! - 所有错误类型实现 `thiserror::Error`，满足 `Send + Sync + 'static`；
//! - `ResultError` 必须 `Clone`：一个结果可能被多个回调、多个 `await` 同时观察。

use std::any::Any;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::result::ResultState;

/// 以引用计数共享的任意错误。
///
/// # 契约说明（What）
/// - 克隆只增加引用计数，[`SharedError::ptr_eq`] 可判断两份句柄是否指向同一个原始错误；
/// - `Display`/`source` 均透传给原始错误。
#[derive(Clone)]
pub struct SharedError(Arc<dyn StdError + Send + Sync + 'static>);

impl SharedError {
    /// 包装任意错误。
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    /// 复用已经共享的错误实例。
    pub fn from_arc(error: Arc<dyn StdError + Send + Sync + 'static>) -> Self {
        Self(error)
    }

    /// 判断两份句柄是否指向同一个错误实例。
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// 访问原始错误。
    pub fn get_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.0
    }

    /// 尝试向下转型为具体错误类型。
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl StdError for SharedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// 仅携带文本的错误，供 [`ResultError::msg`] 使用。
#[derive(Debug, Error)]
#[error("{0}")]
pub struct MessageError(Cow<'static, str>);

impl MessageError {
    /// 返回错误文本。
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// 异步结果的失败原因。
///
/// # 教案式说明
/// - **意图 (Why)**：结果的失败分支需要同时表达“调用方主动取消”“执行体 panic”“执行体返回错误”
///   三种来源，并在扇出给多个观察者时保持错误实例不变。
/// - **契约 (What)**：
///   - `Cancelled`：结果被取消，投递给所有已注册与后注册的失败回调；
///   - `Panicked`：启动器捕获到的 panic，携带 payload 的文本形式；
///   - `Failed`：执行体返回的错误，按原样共享，不做任何包装或替换。
/// - **执行逻辑 (How)**：`PartialEq` 对 `Failed` 比较实例身份而非文本，避免两个内容相同但来源
///   不同的错误被误判为同一次失败。
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ResultError {
    #[error("async result cancelled")]
    Cancelled,
    #[error("task panicked: {0}")]
    Panicked(Cow<'static, str>),
    #[error(transparent)]
    Failed(#[from] SharedError),
}

impl ResultError {
    /// 将任意错误包装为失败原因。
    pub fn failed<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        ResultError::Failed(SharedError::new(error))
    }

    /// 以文本构造失败原因。
    pub fn msg(message: impl Into<Cow<'static, str>>) -> Self {
        Self::failed(MessageError(message.into()))
    }

    /// 将 `catch_unwind` 捕获的 payload 转换为 [`ResultError::Panicked`]。
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<&'static str>() {
            Ok(text) => Cow::Borrowed(*text),
            Err(payload) => match payload.downcast::<String>() {
                Ok(text) => Cow::Owned(*text),
                Err(_) => Cow::Borrowed("<non-string panic payload>"),
            },
        };
        ResultError::Panicked(message)
    }

    /// 是否为取消。
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResultError::Cancelled)
    }

    /// 判断两个失败原因是否为同一次失败。`Failed` 比较实例身份。
    pub fn same_as(&self, other: &ResultError) -> bool {
        match (self, other) {
            (ResultError::Cancelled, ResultError::Cancelled) => true,
            (ResultError::Panicked(left), ResultError::Panicked(right)) => left == right,
            (ResultError::Failed(left), ResultError::Failed(right)) => left.ptr_eq(right),
            _ => false,
        }
    }

    /// 对 `Failed` 分支尝试向下转型。
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            ResultError::Failed(shared) => shared.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl PartialEq for ResultError {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

/// 完成一个已经终结的结果时返回的状态违例。
///
/// 已终结的结果保持原状态不变，也不会再次触发任何回调。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CompletionError {
    #[error("async result already settled as {state:?}")]
    AlreadySettled { state: ResultState },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_errors_compare_by_identity() {
        let first = ResultError::msg("boom");
        let second = ResultError::msg("boom");
        assert_eq!(first, first.clone());
        assert_ne!(first, second);
        assert_eq!(first.to_string(), "boom");
    }

    #[test]
    fn panic_payload_is_rendered() {
        let from_str = ResultError::from_panic(Box::new("static payload"));
        let from_string = ResultError::from_panic(Box::new(String::from("owned payload")));
        let opaque = ResultError::from_panic(Box::new(7_u32));
        assert_eq!(from_str, ResultError::Panicked(Cow::Borrowed("static payload")));
        assert_eq!(from_string.to_string(), "task panicked: owned payload");
        assert!(matches!(opaque, ResultError::Panicked(_)));
    }

    #[test]
    fn downcast_reaches_original_error() {
        let error = ResultError::failed(std::io::Error::other("disk gone"));
        let io = error
            .downcast_ref::<std::io::Error>()
            .expect("io error should be recoverable");
        assert_eq!(io.kind(), std::io::ErrorKind::Other);
        assert!(ResultError::Cancelled.downcast_ref::<std::io::Error>().is_none());
    }
}
