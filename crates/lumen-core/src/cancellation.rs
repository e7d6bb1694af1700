//! 取消能力适配。
//!
//! 把 [`AsyncResult::cancel`] 暴露为独立的可取消操作：调用方只关心“请求取消，并等待取消是否生效”，
//! 拿到的 [`CancellationRequest`] 本身不可再取消。

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;

use crate::error::ResultError;
use crate::result::AsyncResult;

/// 可被请求取消的在途操作。
pub trait CancellableOperation: Send + Sync {
    /// 发起取消，返回取消是否生效的结果。
    fn cancel(&self) -> CancellationRequest;
}

/// 一次取消请求的布尔结果。
///
/// # 契约说明（What）
/// - `Ok(true)`：取消生效，源结果已处于 `Cancelled`；
/// - `Ok(false)`：源结果已终结或不支持取消，其终态不受影响；
/// - `Err(_)`：计算取消结果本身失败，错误原样传递。
pub struct CancellationRequest {
    receiver: oneshot::Receiver<Result<bool, ResultError>>,
    outcome: Option<Result<bool, ResultError>>,
}

impl CancellationRequest {
    fn from_result(result: AsyncResult<bool>) -> Self {
        let (sender, receiver) = oneshot::channel();
        result.observe(move |outcome| {
            let _ = sender.send(outcome);
        });
        Self {
            receiver,
            outcome: None,
        }
    }

    /// 非阻塞地读取取消结果，尚未得出时返回 `None`。
    pub fn try_outcome(&mut self) -> Option<Result<bool, ResultError>> {
        if self.outcome.is_none() {
            match self.receiver.try_recv() {
                Ok(Some(outcome)) => self.outcome = Some(outcome),
                Ok(None) => return None,
                Err(oneshot::Canceled) => self.outcome = Some(Err(ResultError::Cancelled)),
            }
        }
        self.outcome.clone()
    }
}

impl Future for CancellationRequest {
    type Output = Result<bool, ResultError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(outcome) = this.outcome.clone() {
            return Poll::Ready(outcome);
        }
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(received) => {
                let outcome = received.unwrap_or(Err(ResultError::Cancelled));
                this.outcome = Some(outcome.clone());
                Poll::Ready(outcome)
            }
        }
    }
}

impl fmt::Debug for CancellationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationRequest")
            .field("outcome", &self.outcome)
            .finish()
    }
}

/// 以 [`AsyncResult`] 为后端的可取消操作。
#[derive(Debug)]
pub struct ResultCancellation<T> {
    source: AsyncResult<T>,
}

impl<T> CancellableOperation for ResultCancellation<T>
where
    T: Clone + Send + 'static,
{
    fn cancel(&self) -> CancellationRequest {
        CancellationRequest::from_result(self.source.cancel())
    }
}

impl<T> AsyncResult<T>
where
    T: Clone + Send + 'static,
{
    /// 将本结果的取消能力包装为 [`CancellableOperation`]。
    pub fn as_cancellable_operation(&self) -> ResultCancellation<T> {
        ResultCancellation {
            source: self.clone(),
        }
    }
}
