//! 恰好构造一次的懒加载槽位。
//!
//! # 设计背景（Why）
//! - 进程级共享资源（引擎运行时、默认客户端）构造代价高，并且同一进程内只允许存在一个实例；
//!   “只保留一个”不够，必须“只构造一个”；
//! - `OnceLock::get_or_init` 不接受可失败的构造函数，失败时还需要让槽位保持为空以便下次重试。
//!
//! # 逻辑解析（How）
//! - 快路径：`OnceLock::get` 无锁读取已发布的实例；
//! - 慢路径：获取构造闸门后再次检查，仍为空才调用构造函数，成功后发布；
//!   闸门保证同一时刻只有一个构造者，发布在闸门内完成，因此不会出现两个实例。

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

/// 双重检查的懒加载槽位。
pub struct LazySlot<T> {
    value: OnceLock<Arc<T>>,
    gate: Mutex<()>,
}

impl<T> LazySlot<T> {
    pub const fn new() -> Self {
        Self {
            value: OnceLock::new(),
            gate: Mutex::new(()),
        }
    }

    /// 已发布的实例。
    pub fn get(&self) -> Option<Arc<T>> {
        self.value.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.value.get().is_some()
    }

    /// 返回已发布的实例，或在闸门内构造并发布一个新实例。
    ///
    /// 构造失败时槽位保持为空，错误原样返回。
    pub fn get_or_try_init<E, F>(&self, init: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.value.get() {
            return Ok(Arc::clone(value));
        }

        let _gate = self.gate.lock();
        if let Some(value) = self.value.get() {
            return Ok(Arc::clone(value));
        }

        let value = Arc::new(init()?);
        // 闸门内唯一的写入者，set 不会失败。
        let _ = self.value.set(Arc::clone(&value));
        Ok(value)
    }
}

impl<T> Default for LazySlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LazySlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySlot")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
