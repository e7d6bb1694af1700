//! 内容拦截策略。
//!
//! # 设计背景（Why）
//! - 应用设置只暴露一个“增强跟踪保护等级”，引擎却需要反跟踪类别掩码、Cookie 行为、
//!   社交跟踪严格模式等一组离散选项；
//! - [`TrackingProtectionPolicy`] 负责把等级翻译为这些选项，[`ContentBlockingSettings`]
//!   是最终交给引擎构建器的值对象。

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// 反跟踪类别位掩码。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AntiTracking(u32);

impl AntiTracking {
    pub const NONE: Self = Self(0);
    pub const AD: Self = Self(1 << 1);
    pub const ANALYTIC: Self = Self(1 << 2);
    pub const SOCIAL: Self = Self(1 << 3);
    pub const CONTENT: Self = Self(1 << 4);
    pub const TEST: Self = Self(1 << 5);
    pub const CRYPTOMINING: Self = Self(1 << 6);
    pub const FINGERPRINTING: Self = Self(1 << 7);
    pub const STP: Self = Self(1 << 8);

    /// 推荐档：广告、分析、社交、测试、STP 与挖矿脚本。
    pub const RECOMMENDED: Self = Self(
        Self::AD.0
            | Self::ANALYTIC.0
            | Self::SOCIAL.0
            | Self::TEST.0
            | Self::STP.0
            | Self::CRYPTOMINING.0,
    );
    /// 严格档：推荐档加指纹识别。
    pub const STRICT: Self = Self(Self::RECOMMENDED.0 | Self::FINGERPRINTING.0);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for AntiTracking {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AntiTracking {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Cookie 接受策略。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CookieBehavior {
    #[default]
    AcceptAll,
    AcceptFirstParty,
    AcceptNone,
    AcceptVisited,
    AcceptNonTrackers,
}

impl CookieBehavior {
    /// 引擎侧的整数编码。
    pub const fn code(self) -> u8 {
        match self {
            CookieBehavior::AcceptAll => 0,
            CookieBehavior::AcceptFirstParty => 1,
            CookieBehavior::AcceptNone => 2,
            CookieBehavior::AcceptVisited => 3,
            CookieBehavior::AcceptNonTrackers => 4,
        }
    }
}

/// 增强跟踪保护等级。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EtpLevel {
    None,
    #[default]
    Default,
    Strict,
}

impl EtpLevel {
    /// 引擎侧的整数编码。
    pub const fn code(self) -> u8 {
        match self {
            EtpLevel::None => 0,
            EtpLevel::Default => 1,
            EtpLevel::Strict => 2,
        }
    }
}

/// 由 ETP 等级推导出的跟踪保护策略。
///
/// | 等级 | 反跟踪掩码 | Cookie 行为 | 拦截内容 |
/// |------|------------|-------------|----------|
/// | `None` | `NONE` | `AcceptAll` | 否 |
/// | `Default` | `RECOMMENDED` | `AcceptNonTrackers` | 否 |
/// | `Strict` | `STRICT` | `AcceptNonTrackers` | 是 |
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackingProtectionPolicy {
    anti_tracking: AntiTracking,
    cookie_behavior: CookieBehavior,
}

impl TrackingProtectionPolicy {
    pub const fn none() -> Self {
        Self {
            anti_tracking: AntiTracking::NONE,
            cookie_behavior: CookieBehavior::AcceptAll,
        }
    }

    pub const fn recommended() -> Self {
        Self {
            anti_tracking: AntiTracking::RECOMMENDED,
            cookie_behavior: CookieBehavior::AcceptNonTrackers,
        }
    }

    pub const fn strict() -> Self {
        Self {
            anti_tracking: AntiTracking::STRICT,
            cookie_behavior: CookieBehavior::AcceptNonTrackers,
        }
    }

    pub const fn for_level(level: EtpLevel) -> Self {
        match level {
            EtpLevel::None => Self::none(),
            EtpLevel::Default => Self::recommended(),
            EtpLevel::Strict => Self::strict(),
        }
    }

    pub const fn anti_tracking(&self) -> AntiTracking {
        self.anti_tracking
    }

    pub const fn cookie_behavior(&self) -> CookieBehavior {
        self.cookie_behavior
    }

    /// 仅严格档会拦截被识别为跟踪器的内容。
    pub fn should_block_content(&self) -> bool {
        self.anti_tracking == AntiTracking::STRICT
    }
}

/// 交给引擎构建器的内容拦截选项。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentBlockingSettings {
    pub anti_tracking: AntiTracking,
    pub strict_social_tracking_protection: bool,
    pub cookie_behavior: CookieBehavior,
    pub cookie_behavior_private_mode: CookieBehavior,
    pub etp_level: EtpLevel,
}

impl ContentBlockingSettings {
    /// 按 ETP 等级生成整组选项；普通与隐私模式共用同一 Cookie 行为。
    pub fn for_level(level: EtpLevel) -> Self {
        let policy = TrackingProtectionPolicy::for_level(level);
        Self {
            anti_tracking: policy.anti_tracking(),
            strict_social_tracking_protection: policy.should_block_content(),
            cookie_behavior: policy.cookie_behavior(),
            cookie_behavior_private_mode: policy.cookie_behavior(),
            etp_level: level,
        }
    }
}

impl Default for ContentBlockingSettings {
    fn default() -> Self {
        Self::for_level(EtpLevel::default())
    }
}
