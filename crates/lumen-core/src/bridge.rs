//! 回调到 `await` 的桥接。
//!
//! # 设计综述（Why）
//! - 回调式结果需要在 `async` 代码中表现为单个挂起点：注册一次回调对，
//!   成功时以值恢复等待方，失败时以错误恢复等待方；
//! - 挂起点不轮询、不设默认超时，超时由调用方在外层组合（例如 `tokio::time::timeout`）。
//!
//! # 取消传播（What）
//! - 等待方在结果终结前被丢弃（外层超时、`select!` 落选、任务被中止），
//!   [`Await`] 会向源结果发起 [`AsyncResult::cancel`]，避免在途工作失去观察者后继续泄漏。

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use tracing::debug;

use crate::error::ResultError;
use crate::result::{AsyncResult, Outcome};

/// 等待 [`AsyncResult`] 终结的 Future。
///
/// # 契约说明（What）
/// - 输出恰好一次：成功值或原样转发的失败原因；
/// - 恢复发生在完成调用之后，恢复线程不做保证；
/// - 未完成即被丢弃时向源结果请求取消。
#[must_use = "futures do nothing unless polled"]
pub struct Await<T>
where
    T: Clone + Send + 'static,
{
    source: AsyncResult<T>,
    receiver: oneshot::Receiver<Outcome<T>>,
    resolved: bool,
}

impl<T> AsyncResult<T>
where
    T: Clone + Send + 'static,
{
    /// 返回等待本结果终结的 Future。
    pub fn wait(&self) -> Await<T> {
        let (sender, receiver) = oneshot::channel();
        self.observe(move |outcome| {
            // 等待方已放弃时发送失败，结果无人接收即可。
            let _ = sender.send(outcome);
        });
        Await {
            source: self.clone(),
            receiver,
            resolved: false,
        }
    }

    /// 在当前线程阻塞直到结果终结。
    ///
    /// 不得在异步运行时的工作线程上调用，否则会占住调度线程。
    pub fn wait_blocking(&self) -> Outcome<T> {
        futures::executor::block_on(self.wait())
    }
}

impl<T> Future for Await<T>
where
    T: Clone + Send + 'static,
{
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(received) => {
                this.resolved = true;
                // 发送端只会随结果状态一同被销毁，此时视为取消。
                Poll::Ready(received.unwrap_or(Err(ResultError::Cancelled)))
            }
        }
    }
}

impl<T> Drop for Await<T>
where
    T: Clone + Send + 'static,
{
    fn drop(&mut self) {
        if self.resolved || self.source.is_settled() {
            return;
        }
        debug!("await dropped before settlement, propagating cancel");
        // 取消结果由源结果自身的状态体现，这里无需等待。
        let _ = self.source.cancel();
    }
}

impl<T> IntoFuture for AsyncResult<T>
where
    T: Clone + Send + 'static,
{
    type Output = Outcome<T>;
    type IntoFuture = Await<T>;

    fn into_future(self) -> Self::IntoFuture {
        self.wait()
    }
}
