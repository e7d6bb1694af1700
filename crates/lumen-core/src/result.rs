//! 单次完成的异步结果容器。
//!
//! # 设计综述（Why）
//! - 回调式 API（注册 `on_value`/`on_failure`）与 `async/await` 世界之间需要一个共同的状态机：
//!   完成方只负责写入结果，观察方可以在任意线程、任意时刻注册回调；
//! - 状态机显式建模为 `Pending → Completed | Failed | Cancelled` 四态，迁移一次性完成，
//!   不依赖语言内建的挂起原语，因而既能托管回调，也能托管 [`Await`](crate::Await)。
//!
//! # 并发模型（How）
//! - 每个结果持有一把互斥锁保护“状态 + 待触发回调列表”，完成与注册在锁内互斥，
//!   因此并发注册的回调要么进入列表随完成一起触发，要么观察到终态后立即触发，不会丢失也不会重复；
//! - 一个原子相位字节在持锁迁移时以 `Release` 写入，供 [`AsyncResult::state`] 无锁读取；
//! - 回调总是在释放锁之后执行，回调内部可以安全地再次访问同一个结果。
//!
//! # 契约说明（What）
//! - 完成一个已终结的结果返回 [`CompletionError::AlreadySettled`]，原终态保持不变，回调不会二次触发；
//! - 同一回调对只会触发其中一个分支，且只触发一次；
//! - 取消成功的结果进入 `Cancelled`，此后永远不会变为 `Completed`。

use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use tracing::{debug, trace, warn};

use crate::error::{CompletionError, ResultError};
use crate::sync::{AtomicU8, Mutex, Ordering};

/// 结果的最终形态：成功值或失败原因。
pub type Outcome<T> = Result<T, ResultError>;

type Callback<T> = Box<dyn FnOnce(Outcome<T>) + Send + 'static>;
type StartHook = Box<dyn FnOnce() + Send + 'static>;

/// 结果所处的状态。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultState {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl ResultState {
    const fn to_u8(self) -> u8 {
        match self {
            ResultState::Pending => 0,
            ResultState::Completed => 1,
            ResultState::Failed => 2,
            ResultState::Cancelled => 3,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => ResultState::Pending,
            1 => ResultState::Completed,
            2 => ResultState::Failed,
            _ => ResultState::Cancelled,
        }
    }

    /// 是否已进入终态。
    pub const fn is_settled(self) -> bool {
        !matches!(self, ResultState::Pending)
    }
}

/// 取消委托：由结果的生产者决定一次取消请求能否生效。
///
/// # 契约说明（What）
/// - 返回的 `AsyncResult<bool>` 为 `true` 时，被取消的结果会尝试迁移到 `Cancelled`；
/// - 返回失败时，失败原因原样投递给取消请求方，不会被折算为 `false`；
/// - 委托可能在任意线程被调用，实现需满足 `Send + Sync`。
pub trait CancellationDelegate: Send + Sync + 'static {
    fn cancel(&self) -> AsyncResult<bool>;
}

impl<F> CancellationDelegate for F
where
    F: Fn() -> AsyncResult<bool> + Send + Sync + 'static,
{
    fn cancel(&self) -> AsyncResult<bool> {
        self()
    }
}

#[derive(Clone)]
enum CancellationPolicy {
    /// 直接把待定结果迁移到 `Cancelled`。
    Direct,
    /// 不支持取消，取消请求恒为 `false`。
    Unsupported,
    Delegated(Arc<dyn CancellationDelegate>),
}

impl fmt::Debug for CancellationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancellationPolicy::Direct => f.write_str("Direct"),
            CancellationPolicy::Unsupported => f.write_str("Unsupported"),
            CancellationPolicy::Delegated(_) => f.write_str("Delegated"),
        }
    }
}

enum Slot<T> {
    Pending(Vec<Callback<T>>),
    Completed(T),
    Failed(ResultError),
    Cancelled,
}

impl<T: Clone> Slot<T> {
    fn state(&self) -> ResultState {
        match self {
            Slot::Pending(_) => ResultState::Pending,
            Slot::Completed(_) => ResultState::Completed,
            Slot::Failed(_) => ResultState::Failed,
            Slot::Cancelled => ResultState::Cancelled,
        }
    }

    fn outcome(&self) -> Option<Outcome<T>> {
        match self {
            Slot::Pending(_) => None,
            Slot::Completed(value) => Some(Ok(value.clone())),
            Slot::Failed(error) => Some(Err(error.clone())),
            Slot::Cancelled => Some(Err(ResultError::Cancelled)),
        }
    }
}

struct Shared<T> {
    phase: AtomicU8,
    slot: Mutex<Slot<T>>,
    cancellation: Mutex<CancellationPolicy>,
    start_hook: Mutex<Option<StartHook>>,
}

/// 单次完成的异步结果。
///
/// # 教案式说明
/// - **意图 (Why)**：为回调式生产者与 `await` 消费者提供同一个交汇点；
/// - **逻辑 (How)**：句柄是共享状态的引用计数指针，`clone` 得到的是同一个结果的另一份句柄；
///   成功值按 `Clone` 扇出给每个观察者；
/// - **契约 (What)**：
///   - 注册先于完成的回调在完成时、由完成方所在线程触发；
///   - 注册晚于完成的回调在注册线程上立即触发；
///   - `complete`/`complete_exceptionally` 在非 `Pending` 状态下返回 [`CompletionError`]。
pub struct AsyncResult<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for AsyncResult<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for AsyncResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResult")
            .field(
                "state",
                &ResultState::from_u8(self.shared.phase.load(Ordering::Acquire)),
            )
            .finish()
    }
}

impl<T> AsyncResult<T>
where
    T: Clone + Send + 'static,
{
    /// 创建待定结果，取消请求会直接把它迁移到 `Cancelled`。
    pub fn new() -> Self {
        Self::with_policy(CancellationPolicy::Direct)
    }

    /// 创建不支持取消的待定结果，取消请求恒为 `false`。
    pub fn non_cancellable() -> Self {
        Self::with_policy(CancellationPolicy::Unsupported)
    }

    /// 创建已成功完成的结果。
    pub fn from_value(value: T) -> Self {
        Self::settled(Slot::Completed(value))
    }

    /// 创建已失败的结果。
    pub fn from_error(error: ResultError) -> Self {
        Self::settled(Slot::Failed(error))
    }

    fn with_policy(policy: CancellationPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                phase: AtomicU8::new(ResultState::Pending.to_u8()),
                slot: Mutex::new(Slot::Pending(Vec::new())),
                cancellation: Mutex::new(policy),
                start_hook: Mutex::new(None),
            }),
        }
    }

    fn settled(slot: Slot<T>) -> Self {
        let state = slot.state();
        Self {
            shared: Arc::new(Shared {
                phase: AtomicU8::new(state.to_u8()),
                slot: Mutex::new(slot),
                cancellation: Mutex::new(CancellationPolicy::Direct),
                start_hook: Mutex::new(None),
            }),
        }
    }

    /// 当前状态，无锁读取。
    pub fn state(&self) -> ResultState {
        ResultState::from_u8(self.shared.phase.load(Ordering::Acquire))
    }

    /// 是否已终结。
    pub fn is_settled(&self) -> bool {
        self.state().is_settled()
    }

    /// 终结后返回结果副本，待定时返回 `None`。
    pub fn try_outcome(&self) -> Option<Outcome<T>> {
        self.shared.slot.lock().outcome()
    }

    /// 以成功值完成结果。
    pub fn complete(&self, value: T) -> Result<(), CompletionError> {
        self.transition(Slot::Completed(value))
    }

    /// 以失败原因完成结果。
    pub fn complete_exceptionally(&self, error: ResultError) -> Result<(), CompletionError> {
        self.transition(Slot::Failed(error))
    }

    /// 按 [`Outcome`] 完成结果；`Err(ResultError::Cancelled)` 迁移到 `Cancelled`。
    pub fn settle(&self, outcome: Outcome<T>) -> Result<(), CompletionError> {
        match outcome {
            Ok(value) => self.transition(Slot::Completed(value)),
            Err(ResultError::Cancelled) => self.transition(Slot::Cancelled),
            Err(error) => self.transition(Slot::Failed(error)),
        }
    }

    fn transition(&self, next: Slot<T>) -> Result<(), CompletionError> {
        let (callbacks, outcome) = {
            let mut slot = self.shared.slot.lock();
            let callbacks = match &mut *slot {
                Slot::Pending(callbacks) => mem::take(callbacks),
                settled => {
                    return Err(CompletionError::AlreadySettled {
                        state: settled.state(),
                    });
                }
            };
            let state = next.state();
            let outcome = next.outcome();
            *slot = next;
            self.shared.phase.store(state.to_u8(), Ordering::Release);
            (callbacks, outcome)
        };

        // 终态下的启动钩子已无意义，释放其持有的资源。
        drop(self.shared.start_hook.lock().take());

        if let Some(outcome) = outcome {
            for callback in callbacks {
                let delivered = outcome.clone();
                if let Err(payload) =
                    panic::catch_unwind(AssertUnwindSafe(move || callback(delivered)))
                {
                    let error = ResultError::from_panic(payload);
                    warn!(%error, "result callback panicked, continuing with remaining callbacks");
                }
            }
        }
        Ok(())
    }

    /// 注册原始回调，结果终结时以 [`Outcome`] 调用一次。
    ///
    /// 由完成方触发的回调若 panic，panic 被记录为告警，不影响其余回调；
    /// 注册时立即触发的回调 panic 会传回注册方。对惰性启动的结果，首次观察会触发启动。
    pub fn observe<F>(&self, callback: F)
    where
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        self.start();
        let mut slot = self.shared.slot.lock();
        let outcome = match slot.outcome() {
            Some(outcome) => outcome,
            None => {
                if let Slot::Pending(callbacks) = &mut *slot {
                    callbacks.push(Box::new(callback));
                }
                return;
            }
        };
        drop(slot);
        callback(outcome);
    }

    /// 注册成功/失败回调对，返回代表回调自身结果的新结果。
    ///
    /// # 契约说明（What）
    /// - 恰好调用 `on_value` 或 `on_failure` 之一，且只调用一次；`Cancelled` 走 `on_failure`；
    /// - 回调返回的结果被转发到新结果；回调返回 `Err` 或 panic 时新结果失败；
    /// - 取消新结果会向上游传播取消请求；处理器已返回待定结果时改为取消该结果。
    ///   两者均以弱引用持有，不会延长其生命周期。
    pub fn then<U, S, F>(&self, on_value: S, on_failure: F) -> AsyncResult<U>
    where
        U: Clone + Send + 'static,
        S: FnOnce(T) -> Result<AsyncResult<U>, ResultError> + Send + 'static,
        F: FnOnce(ResultError) -> Result<AsyncResult<U>, ResultError> + Send + 'static,
    {
        let next = AsyncResult::<U>::new();
        let upstream = self.downgrade();
        next.set_cancellation_delegate(Arc::new(move || match upstream.upgrade() {
            Some(source) => source.cancel(),
            None => AsyncResult::from_value(false),
        }));

        let target = next.clone();
        self.observe(move |outcome| {
            let produced = panic::catch_unwind(AssertUnwindSafe(move || match outcome {
                Ok(value) => on_value(value),
                Err(error) => on_failure(error),
            }))
            .unwrap_or_else(|payload| Err(ResultError::from_panic(payload)));

            match produced {
                Ok(inner) => {
                    // 上游已终结，取消请求改由处理器返回的在途结果承接。
                    if !inner.is_settled() {
                        let pending = inner.downgrade();
                        target.set_cancellation_delegate(Arc::new(move || {
                            match pending.upgrade() {
                                Some(inner) => inner.cancel(),
                                // 已无持有者能完成它，直接接受取消。
                                None => AsyncResult::from_value(true),
                            }
                        }));
                    }
                    inner.forward_to(target)
                }
                Err(error) => target.settle_or_log(Err(error)),
            }
        });
        next
    }

    /// 只处理成功分支，失败原样向下传递。
    pub fn then_value<U, S>(&self, on_value: S) -> AsyncResult<U>
    where
        U: Clone + Send + 'static,
        S: FnOnce(T) -> Result<AsyncResult<U>, ResultError> + Send + 'static,
    {
        self.then(on_value, Err)
    }

    /// 只处理失败分支，成功值原样向下传递。
    pub fn exceptionally<F>(&self, on_failure: F) -> AsyncResult<T>
    where
        F: FnOnce(ResultError) -> Result<AsyncResult<T>, ResultError> + Send + 'static,
    {
        self.then(|value| Ok(AsyncResult::from_value(value)), on_failure)
    }

    /// 对成功值做同步映射。
    pub fn map<U, M>(&self, mapper: M) -> AsyncResult<U>
    where
        U: Clone + Send + 'static,
        M: FnOnce(T) -> U + Send + 'static,
    {
        self.then_value(move |value| Ok(AsyncResult::from_value(mapper(value))))
    }

    /// 把本结果的终态转发给 `target`。
    pub(crate) fn forward_to(&self, target: AsyncResult<T>) {
        self.observe(move |outcome| target.settle_or_log(outcome));
    }

    pub(crate) fn settle_or_log(&self, outcome: Outcome<T>) {
        if let Err(conflict) = self.settle(outcome) {
            debug!(%conflict, "dropping outcome for an already settled result");
        }
    }

    /// 设置取消委托。
    pub fn set_cancellation_delegate(&self, delegate: Arc<dyn CancellationDelegate>) {
        *self.shared.cancellation.lock() = CancellationPolicy::Delegated(delegate);
    }

    /// 移除取消委托，恢复为直接取消。
    pub fn clear_cancellation_delegate(&self) {
        *self.shared.cancellation.lock() = CancellationPolicy::Direct;
    }

    /// 请求取消，返回取消是否生效。
    ///
    /// # 契约说明（What）
    /// - 已终结：立即得到 `false`，原终态不变；
    /// - 直接取消：原子地迁移到 `Cancelled`，迁移成功得到 `true`；
    /// - 不支持取消：立即得到 `false`；
    /// - 委托取消：委托给出 `true` 且本结果最终处于 `Cancelled` 时得到 `true`；委托失败原样传播。
    pub fn cancel(&self) -> AsyncResult<bool> {
        if self.is_settled() {
            trace!(state = ?self.state(), "cancel requested on a settled result");
            return AsyncResult::from_value(false);
        }

        let policy = self.shared.cancellation.lock().clone();
        match policy {
            CancellationPolicy::Unsupported => AsyncResult::from_value(false),
            CancellationPolicy::Direct => {
                let cancelled = self.transition(Slot::Cancelled).is_ok();
                trace!(cancelled, "direct cancellation");
                AsyncResult::from_value(cancelled)
            }
            CancellationPolicy::Delegated(delegate) => {
                let source = self.clone();
                delegate.cancel().then_value(move |accepted| {
                    let cancelled = accepted
                        && (source.transition(Slot::Cancelled).is_ok()
                            || source.state() == ResultState::Cancelled);
                    trace!(accepted, cancelled, "delegated cancellation");
                    Ok(AsyncResult::from_value(cancelled))
                })
            }
        }
    }

    /// 安装惰性启动钩子，首次观察或显式 [`AsyncResult::start`] 时执行。
    pub(crate) fn set_start_hook(&self, hook: StartHook) {
        *self.shared.start_hook.lock() = Some(hook);
    }

    /// 启动惰性结果背后的工作；返回本次调用是否真正触发了启动。
    pub fn start(&self) -> bool {
        let hook = self.shared.start_hook.lock().take();
        match hook {
            Some(hook) => {
                hook();
                true
            }
            None => false,
        }
    }

    pub(crate) fn downgrade(&self) -> WeakResult<T> {
        WeakResult {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

impl<T> Default for AsyncResult<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// 不延长生命周期的结果引用。
pub(crate) struct WeakResult<T> {
    shared: Weak<Shared<T>>,
}

impl<T> WeakResult<T> {
    pub(crate) fn upgrade(&self) -> Option<AsyncResult<T>> {
        self.shared.upgrade().map(|shared| AsyncResult { shared })
    }
}

