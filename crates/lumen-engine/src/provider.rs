//! 进程级共享的引擎运行时与客户端。
//!
//! # 设计背景（Why）
//! - 引擎运行时在一个进程中只能存在一个实例，默认网络客户端又依赖运行时派生；
//!   两者都必须在首次使用时构造、此后被所有调用方共享；
//! - 多个线程可能同时请求运行时，必须保证只发生一次构造，而不是构造多个再丢弃多余的。
//!
//! # 契约说明（What）
//! - 运行时与默认客户端各占一个 [`LazySlot`]，从未初始化到已初始化只迁移一次，没有销毁路径；
//! - 构造失败不写入槽位，下一次调用会重新尝试；
//! - [`EngineProvider::get_or_create_client`] 会按需先初始化运行时，
//!   [`EngineProvider::create_client`] 则要求运行时已经存在。

use std::sync::Arc;

use lumen_core::{AsyncResult, ExecutionContext, LaunchOptions, ResultError, TaskScope};
use tracing::{debug, info, warn};

use crate::content_blocking::ContentBlockingSettings;
use crate::context::EngineContext;
use crate::error::EngineError;
use crate::factory::{EngineFactory, EngineRuntime};
use crate::runtime_settings::{RuntimeSettings, RuntimeSettingsBuilder};
use crate::settings::EngineSettings;
use crate::slot::LazySlot;

/// 运行时派生出的客户端类型。
pub type ClientOf<F> = <<F as EngineFactory>::Runtime as EngineRuntime>::Client;

/// 调试构建追加的启动参数。
pub const DEBUG_ARGUMENTS: &[&str] = &["-purgecaches"];

/// 由应用设置与宿主环境组装运行时参数。
///
/// # 逻辑解析（How）
/// - 内容拦截选项由 ETP 等级推导；
/// - 输入自动缩放与双击缩放总是关闭，控制台输出跟随调试日志开关；
/// - 透明边框宽度大于 0 时启用最大屏幕色深；
/// - 调试构建追加 [`DEBUG_ARGUMENTS`] 并开启 `about:config`；
/// - 配置目录在此处按需创建。
pub fn build_runtime_settings(
    ctx: &EngineContext,
    settings: &EngineSettings,
) -> Result<RuntimeSettings, EngineError> {
    let mut builder = RuntimeSettingsBuilder::default()
        .with_content_blocking(ContentBlockingSettings::for_level(settings.etp_level))
        .with_display_density_override(settings.display_density)
        .with_remote_debugging(settings.remote_debugging)
        .with_display_dpi_override(settings.display_dpi)
        .with_screen_size_override(settings.max_window_width, settings.max_window_height)
        .with_input_auto_zoom(false)
        .with_double_tap_zooming(false)
        .with_debug_logging(settings.debug_logging)
        .with_console_output(settings.debug_logging)
        .with_login_autofill(settings.login_autofill)
        .with_config_file_path(ctx.prepare_config_file_path()?)
        .with_msaa(settings.msaa);

    if let Some(handler) = ctx.crash_handler() {
        builder = builder.with_crash_handler(handler);
    }
    if settings.transparent_border_width > 0 {
        builder = builder.with_use_max_screen_depth(true);
    }
    if ctx.is_debug_build() {
        builder = builder
            .with_arguments(DEBUG_ARGUMENTS.iter().copied())
            .with_about_config(true);
    }
    Ok(builder.build())
}

/// 共享引擎资源的提供者。
///
/// # 教案式说明
/// - **意图 (Why)**：把“恰好构造一次”的约束集中在一处，调用方只需持有同一个提供者；
/// - **逻辑 (How)**：两级 [`LazySlot`]，客户端的构造函数内部先取得运行时；
/// - **契约 (What)**：并发调用 [`EngineProvider::get_or_create_runtime`] 得到同一个 `Arc`，
///   工厂的 `create_runtime` 在成功后不会再被调用。
pub struct EngineProvider<F: EngineFactory> {
    factory: F,
    runtime: LazySlot<F::Runtime>,
    client: LazySlot<ClientOf<F>>,
}

impl<F: EngineFactory> EngineProvider<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            runtime: LazySlot::new(),
            client: LazySlot::new(),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// 返回共享运行时，首次调用时读取设置并构造。
    pub fn get_or_create_runtime(
        &self,
        ctx: &EngineContext,
    ) -> Result<Arc<F::Runtime>, EngineError> {
        self.runtime.get_or_try_init(|| {
            let settings = ctx.settings()?;
            let runtime_settings = build_runtime_settings(ctx, &settings)?;
            debug!(
                source = %ctx.settings_source().describe(),
                msaa = runtime_settings.gl_msaa_level,
                etp = ?settings.etp_level,
                "building engine runtime"
            );
            match self.factory.create_runtime(ctx, runtime_settings) {
                Ok(runtime) => {
                    info!(profile = %ctx.profile_dir().display(), "engine runtime created");
                    Ok(runtime)
                }
                Err(error) => {
                    warn!(%error, "engine runtime construction failed");
                    Err(error)
                }
            }
        })
    }

    pub fn is_runtime_created(&self) -> bool {
        self.runtime.is_initialized()
    }

    /// 已构造的运行时，不触发构造。
    pub fn runtime(&self) -> Option<Arc<F::Runtime>> {
        self.runtime.get()
    }

    /// 由已存在的运行时派生一个新客户端，每次调用都会构造。
    pub fn create_client(&self, ctx: &EngineContext) -> Result<ClientOf<F>, EngineError> {
        let runtime = self.runtime.get().ok_or(EngineError::RuntimeNotInitialized)?;
        runtime.create_fetch_client(ctx)
    }

    /// 返回共享的默认客户端，必要时先初始化运行时。
    pub fn get_or_create_client(
        &self,
        ctx: &EngineContext,
    ) -> Result<Arc<ClientOf<F>>, EngineError> {
        self.client.get_or_try_init(|| {
            let runtime = self.get_or_create_runtime(ctx)?;
            let client = runtime.create_fetch_client(ctx).inspect_err(|error| {
                warn!(%error, "default engine client construction failed");
            })?;
            info!("default engine client created");
            Ok(client)
        })
    }

    /// 在作用域的阻塞线程池上获取运行时，以异步结果交付。
    pub fn launch_runtime(
        self: &Arc<Self>,
        scope: &TaskScope,
        ctx: EngineContext,
    ) -> AsyncResult<Arc<F::Runtime>> {
        let provider = Arc::clone(self);
        let options =
            LaunchOptions::named("engine-runtime").with_context(ExecutionContext::Blocking);
        scope.launch_result(options, async move {
            provider
                .get_or_create_runtime(&ctx)
                .map_err(ResultError::failed)
        })
    }
}
