//! 引擎运行时与客户端的构造接缝。
//!
//! 真实的浏览器引擎由宿主提供；本 crate 只负责“何时构造、构造几次、用什么参数构造”。

use crate::context::EngineContext;
use crate::error::EngineError;
use crate::runtime_settings::RuntimeSettings;

/// 已构造的引擎运行时。
pub trait EngineRuntime: Send + Sync + 'static {
    /// 由运行时派生的网络客户端。
    type Client: Send + Sync + 'static;

    /// 构造本运行时所用的参数。
    fn settings(&self) -> &RuntimeSettings;

    /// 派生一个新的网络客户端。
    fn create_fetch_client(&self, ctx: &EngineContext) -> Result<Self::Client, EngineError>;
}

/// 引擎运行时工厂。
///
/// # 契约说明（What）
/// - [`EngineProvider`](crate::EngineProvider) 保证 `create_runtime` 在成功之前可能被多次调用，
///   成功之后不会再被调用；
/// - 实现可以阻塞（例如加载本地库），调用方负责把它放到合适的线程上。
pub trait EngineFactory: Send + Sync + 'static {
    type Runtime: EngineRuntime;

    fn create_runtime(
        &self,
        ctx: &EngineContext,
        settings: RuntimeSettings,
    ) -> Result<Self::Runtime, EngineError>;
}
