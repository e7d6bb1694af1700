#![deny(unsafe_code)]
#![doc = "lumen-core: 回调式异步结果与结构化并发之间的桥接层。"]
#![doc = ""]
#![doc = "== 能力概览 =="]
#![doc = "1. [`AsyncResult`]：单次完成的结果容器，支持任意线程注册回调、链式组合与取消委托。"]
#![doc = "2. [`Await`]：把结果转换为可 `await` 的 Future，等待方被丢弃时向源结果传播取消。"]
#![doc = "3. [`CancellableOperation`]：把结果的取消能力暴露为独立操作。"]
#![doc = "4. [`TaskScope`]：在 Tokio 运行时内启动执行体，并把其终态汇入 [`AsyncResult`]。"]
#![doc = ""]
#![doc = "== 日志 =="]
#![doc = "全部诊断通过 `tracing` 输出；宿主可调用 [`logging::install`] 安装默认订阅器。"]

mod bridge;
mod cancellation;
mod error;
mod launcher;
mod result;
mod sync;

pub mod logging;

pub use bridge::Await;
pub use cancellation::{CancellableOperation, CancellationRequest, ResultCancellation};
pub use error::{CompletionError, MessageError, ResultError, SharedError};
pub use launcher::{ExecutionContext, LaunchOptions, StartPolicy, TaskScope};
pub use result::{AsyncResult, CancellationDelegate, Outcome, ResultState};
