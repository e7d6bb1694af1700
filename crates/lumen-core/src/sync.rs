//! 同步原语切换层。
//!
//! 启用 `--cfg lumen_loom` 时切换到 Loom 提供的原子与互斥锁，使模型检查能够穷举调度交错；
//! 常规构建使用 `parking_lot::Mutex` 与标准库原子类型。`Arc` 始终使用标准实现。

#[cfg(not(lumen_loom))]
pub(crate) use core::sync::atomic::{AtomicU8, Ordering};
#[cfg(lumen_loom)]
pub(crate) use loom::sync::atomic::{AtomicU8, Ordering};

#[cfg(not(lumen_loom))]
pub(crate) type MutexGuard<'a, T> = parking_lot::MutexGuard<'a, T>;
#[cfg(lumen_loom)]
pub(crate) type MutexGuard<'a, T> = loom::sync::MutexGuard<'a, T>;

/// 互斥锁包装，统一 `lock` 的返回形态。
pub(crate) struct Mutex<T> {
    #[cfg(not(lumen_loom))]
    inner: parking_lot::Mutex<T>,
    #[cfg(lumen_loom)]
    inner: loom::sync::Mutex<T>,
}

impl<T> Mutex<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            #[cfg(not(lumen_loom))]
            inner: parking_lot::Mutex::new(value),
            #[cfg(lumen_loom)]
            inner: loom::sync::Mutex::new(value),
        }
    }

    #[cfg(not(lumen_loom))]
    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }

    // 持锁期间不执行用户回调，中毒只可能来自内部缺陷，此处直接取回守卫。
    #[cfg(lumen_loom)]
    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
