//! 应用设置到运行时参数的翻译测试。
//!
//! - **Why**：运行时参数只在首次构造时读取一次，翻译错误会在整个进程生命周期内生效；
//! - **What**：覆盖内容拦截策略、固定关闭的缩放开关、调试构建参数、透明边框、配置目录与 TOML 来源。

use std::fs;
use std::sync::Arc;

use lumen_engine::{
    AntiTracking, CONFIG_FILE_NAME, CookieBehavior, DEBUG_ARGUMENTS, EngineContext, EngineError,
    EngineSettings, EtpLevel, SettingsSource, TomlSettingsSource, TrackingProtectionPolicy,
    build_runtime_settings,
};

fn context(profile: &tempfile::TempDir, settings: EngineSettings) -> EngineContext {
    EngineContext::new(profile.path().join("engine"), Arc::new(settings))
}

#[test]
fn strict_level_blocks_content_and_rejects_tracker_cookies() {
    let profile = tempfile::tempdir().expect("创建临时目录");
    let settings = EngineSettings {
        etp_level: EtpLevel::Strict,
        ..EngineSettings::default()
    };
    let ctx = context(&profile, settings.clone());
    let runtime = build_runtime_settings(&ctx, &settings).expect("参数组装成功");

    let blocking = &runtime.content_blocking;
    assert_eq!(blocking.anti_tracking, AntiTracking::STRICT);
    assert!(blocking.strict_social_tracking_protection);
    assert_eq!(blocking.cookie_behavior, CookieBehavior::AcceptNonTrackers);
    assert_eq!(blocking.cookie_behavior_private_mode, CookieBehavior::AcceptNonTrackers);
    assert_eq!(blocking.etp_level, EtpLevel::Strict);
}

#[test]
fn policy_table_matches_levels() {
    let none = TrackingProtectionPolicy::for_level(EtpLevel::None);
    assert_eq!(none.anti_tracking(), AntiTracking::NONE);
    assert_eq!(none.cookie_behavior().code(), 0);
    assert!(!none.should_block_content());

    let recommended = TrackingProtectionPolicy::for_level(EtpLevel::Default);
    assert_eq!(recommended.anti_tracking(), AntiTracking::RECOMMENDED);
    assert_eq!(recommended.cookie_behavior().code(), 4);
    assert!(!recommended.should_block_content());

    assert!(TrackingProtectionPolicy::strict().should_block_content());
}

#[test]
fn display_and_feature_flags_follow_settings() {
    let profile = tempfile::tempdir().expect("创建临时目录");
    let settings = EngineSettings {
        display_density: 1.5,
        display_dpi: 480,
        max_window_width: 1920,
        max_window_height: 1080,
        remote_debugging: true,
        debug_logging: true,
        login_autofill: false,
        ..EngineSettings::default()
    };
    let ctx = context(&profile, settings.clone())
        .with_crash_handler("lumen-crash-reporter")
        .with_debug_build(false);
    let runtime = build_runtime_settings(&ctx, &settings).expect("参数组装成功");

    assert_eq!(runtime.display_density_override, Some(1.5));
    assert_eq!(runtime.display_dpi_override, Some(480));
    assert_eq!(runtime.screen_size_override, Some((1920, 1080)));
    assert!(runtime.remote_debugging);
    assert!(!runtime.input_auto_zoom, "输入自动缩放总是关闭");
    assert!(!runtime.double_tap_zooming, "双击缩放总是关闭");
    assert!(runtime.debug_logging);
    assert!(runtime.console_output, "控制台输出跟随调试日志");
    assert!(!runtime.login_autofill);
    assert_eq!(runtime.crash_handler.as_deref(), Some("lumen-crash-reporter"));
    assert!(runtime.arguments.is_empty());
    assert!(!runtime.about_config);
    assert!(!runtime.use_max_screen_depth);
}

#[test]
fn debug_builds_purge_caches_and_expose_about_config() {
    let profile = tempfile::tempdir().expect("创建临时目录");
    let settings = EngineSettings {
        transparent_border_width: 2,
        ..EngineSettings::default()
    };
    let ctx = context(&profile, settings.clone()).with_debug_build(true);
    let runtime = build_runtime_settings(&ctx, &settings).expect("参数组装成功");

    assert_eq!(runtime.arguments, DEBUG_ARGUMENTS);
    assert!(runtime.about_config);
    assert!(runtime.use_max_screen_depth, "透明边框需要最大屏幕色深");
}

#[test]
fn config_directory_is_created_on_demand() {
    let profile = tempfile::tempdir().expect("创建临时目录");
    let settings = EngineSettings::default();
    let ctx = context(&profile, settings.clone());
    let engine_dir = profile.path().join("engine");
    assert!(!engine_dir.exists());

    let runtime = build_runtime_settings(&ctx, &settings).expect("参数组装成功");
    assert!(engine_dir.is_dir());
    assert_eq!(runtime.config_file_path, Some(engine_dir.join(CONFIG_FILE_NAME)));
}

#[test]
fn toml_source_reads_settings_from_disk() {
    let profile = tempfile::tempdir().expect("创建临时目录");
    let path = profile.path().join("settings.toml");
    fs::write(
        &path,
        "etp_level = \"none\"\nmsaa = 2\nremote_debugging = true\n",
    )
    .expect("写入设置文件");

    let source = TomlSettingsSource::new(&path);
    let settings = source.load().expect("合法的设置文件");
    assert_eq!(settings.etp_level, EtpLevel::None);
    assert_eq!(settings.msaa, 2);
    assert!(settings.remote_debugging);
    assert_eq!(source.describe(), path.display().to_string());
}

#[test]
fn malformed_toml_reports_the_source_path() {
    let profile = tempfile::tempdir().expect("创建临时目录");
    let path = profile.path().join("broken.toml");
    fs::write(&path, "msaa = \"two\"\n").expect("写入设置文件");

    match TomlSettingsSource::new(&path).load() {
        Err(EngineError::Settings { source_name, .. }) => {
            assert_eq!(source_name, path.display().to_string());
        }
        other => panic!("应当返回设置错误，实际为 {other:?}"),
    }
}
