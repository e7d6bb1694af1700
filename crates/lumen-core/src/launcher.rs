//! 在并发作用域内启动任务，并把其结果汇入 [`AsyncResult`]。
//!
//! # 设计综述（Why）
//! - 异步执行体需要以回调式结果的形态交给外部系统，启动方必须保证：结果先于执行体完成返回，
//!   执行体的任何失败（包括 panic）都被转发到结果上，而不会在作用域里无人观察地消失；
//! - 执行上下文与启动策略只是配置项，不产生额外的代码路径。
//!
//! # 执行逻辑（How）
//! - 结果在派发前创建；执行体被 `catch_unwind` 包裹后交给 Tokio 运行时，结束时写回结果；
//! - 结果的取消委托持有任务的 `AbortHandle`，取消即中止在途任务；
//! - 任务 Future 未跑完就被销毁（中止、运行时关闭）时，随任务移动的守卫把仍待定的结果迁移到
//!   `Cancelled`，等待方不会永久挂起；
//! - 惰性启动时任务先等待启动闸门，闸门由结果的首次观察或显式 [`AsyncResult::start`] 打开；
//!   闸门打开前任务只持有结果的弱引用，结果全部句柄被丢弃后任务随之退出。

use std::borrow::Cow;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::channel::oneshot;
use tokio::runtime::{Handle, TryCurrentError};
use tracing::{debug, warn};

use crate::error::ResultError;
use crate::result::{AsyncResult, Outcome, WeakResult};

/// 执行体运行在哪个执行上下文。
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub enum ExecutionContext {
    /// 沿用作用域绑定的运行时。
    #[default]
    Inherit,
    /// 投递到指定运行时（例如专用工作池）。
    Runtime(Handle),
    /// 在作用域运行时的阻塞线程池上驱动执行体。
    ///
    /// 已开始运行的阻塞任务无法被中止，取消只会让结果进入 `Cancelled`。
    Blocking,
}

/// 执行体何时开始运行。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum StartPolicy {
    /// 派发后立即运行。
    #[default]
    Immediate,
    /// 结果首次被观察或被显式启动时运行。
    Lazy,
}

/// 启动任务时的元信息。
///
/// # 契约说明（What）
/// - `name`：用于日志聚合，缺省记为 `anonymous`；
/// - `context`：执行上下文，默认沿用作用域运行时；
/// - `start`：启动策略，默认立即启动。
#[derive(Clone, Debug, Default)]
pub struct LaunchOptions {
    pub name: Option<Cow<'static, str>>,
    pub context: ExecutionContext,
    pub start: StartPolicy,
}

impl LaunchOptions {
    /// 以给定任务名构造配置。
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        LaunchOptions {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// 指定执行上下文。
    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// 指定启动策略。
    pub fn with_start(mut self, start: StartPolicy) -> Self {
        self.start = start;
        self
    }
}

/// 绑定到 Tokio 运行时的任务作用域。
///
/// # 教案式说明
/// - **意图 (Why)**：为“在作用域内运行一段工作并得到回调式结果”提供唯一入口；
/// - **契约 (What)**：
///   - [`TaskScope::launch_result`] 不阻塞，返回时执行体未必完成；
///   - 执行体返回 `Ok(v)` 时结果以 `v` 完成，返回 `Err(e)` 时以 `e` 原样失败，panic 转为
///     [`ResultError::Panicked`]；
///   - 结果被取消后，执行体迟到的完成被记录为调试日志并丢弃。
#[derive(Debug)]
pub struct TaskScope {
    name: Cow<'static, str>,
    handle: Handle,
    launched: AtomicU64,
}

impl TaskScope {
    /// 在给定运行时上构造作用域。
    pub fn new(name: impl Into<Cow<'static, str>>, handle: Handle) -> Self {
        Self {
            name: name.into(),
            handle,
            launched: AtomicU64::new(0),
        }
    }

    /// 绑定当前线程所在的运行时；不在运行时内时返回错误。
    pub fn current(name: impl Into<Cow<'static, str>>) -> Result<Self, TryCurrentError> {
        Ok(Self::new(name, Handle::try_current()?))
    }

    /// 作用域名称。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 作用域绑定的运行时句柄。
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// 已启动的任务数。
    pub fn launched(&self) -> u64 {
        self.launched.load(Ordering::Relaxed)
    }

    /// 启动执行体并返回代表其结果的 [`AsyncResult`]。
    pub fn launch_result<T, W>(&self, options: LaunchOptions, work: W) -> AsyncResult<T>
    where
        T: Clone + Send + 'static,
        W: Future<Output = Outcome<T>> + Send + 'static,
    {
        let result = AsyncResult::new();
        let seq = self.launched.fetch_add(1, Ordering::Relaxed) + 1;
        let task_name = options
            .name
            .clone()
            .unwrap_or(Cow::Borrowed("anonymous"));
        let scope_name = self.name.clone();

        let gate = match options.start {
            StartPolicy::Immediate => None,
            StartPolicy::Lazy => {
                let (opener, gate) = oneshot::channel::<()>();
                result.set_start_hook(Box::new(move || {
                    let _ = opener.send(());
                }));
                Some(gate)
            }
        };

        let guard = DropGuard {
            target: result.downgrade(),
            scope: scope_name.clone(),
            task: task_name.clone(),
            seq,
        };
        let strong = gate.is_none().then(|| result.clone());
        let task = async move {
            let guard = guard;
            let target = match gate {
                Some(gate) => {
                    if gate.await.is_err() {
                        debug!(
                            scope = %scope_name,
                            task = %task_name,
                            seq,
                            "lazy task dropped before start"
                        );
                        return;
                    }
                    match guard.target.upgrade() {
                        Some(target) => target,
                        None => return,
                    }
                }
                None => match strong {
                    Some(target) => target,
                    None => return,
                },
            };

            debug!(scope = %scope_name, task = %task_name, seq, "task started");
            let outcome = AssertUnwindSafe(work)
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(ResultError::from_panic(payload)));

            if let Err(ResultError::Panicked(message)) = &outcome {
                warn!(scope = %scope_name, task = %task_name, seq, %message, "task panicked");
            }
            if let Err(conflict) = target.settle(outcome) {
                debug!(
                    scope = %scope_name,
                    task = %task_name,
                    seq,
                    %conflict,
                    "task finished after its result settled"
                );
            }
        };

        let join = match options.context {
            ExecutionContext::Inherit => self.handle.spawn(task),
            ExecutionContext::Runtime(handle) => handle.spawn(task),
            ExecutionContext::Blocking => {
                let driver = self.handle.clone();
                self.handle.spawn_blocking(move || driver.block_on(task))
            }
        };

        let abort = join.abort_handle();
        result.set_cancellation_delegate(Arc::new(move || {
            abort.abort();
            AsyncResult::from_value(true)
        }));

        debug!(
            scope = %self.name,
            task = ?options.name,
            seq,
            start = ?options.start,
            "task launched"
        );
        result
    }
}

/// 随任务 Future 一同销毁的守卫：任务未写回结果就被丢弃时，把仍待定的结果迁移到 `Cancelled`。
struct DropGuard<T>
where
    T: Clone + Send + 'static,
{
    target: WeakResult<T>,
    scope: Cow<'static, str>,
    task: Cow<'static, str>,
    seq: u64,
}

impl<T> Drop for DropGuard<T>
where
    T: Clone + Send + 'static,
{
    fn drop(&mut self) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        if target.is_settled() {
            return;
        }
        debug!(
            scope = %self.scope,
            task = %self.task,
            seq = self.seq,
            "task dropped before settling its result"
        );
        target.settle_or_log(Err(ResultError::Cancelled));
    }
}
