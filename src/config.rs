//! 配置管理模块
//! 支持从环境变量加载配置
//!
//! 各调用点的超时/尝试预算是可调策略，不是协议不变量。
//! 唯一的硬性要求：每个预算必须有限且非零——最终等待结果的是
//! 盯着界面的人，无界循环是挂死而不是重试。

use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::infrastructure::retry::{DelayStrategy, RetryPolicy};

/// 库配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub verification: VerificationConfig,
    pub handle_refresh: HandleRefreshConfig,
    pub confirmation: ConfirmationConfig,
    pub indexer: IndexerConfig,
    pub logging: LoggingConfig,
}

/// 链验证配置（ChainVerifier）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// 总验证预算（毫秒）
    pub timeout_ms: u64,
    /// 轮询间隔（毫秒）
    pub interval_ms: u64,
}

/// 句柄刷新配置（WalletClientResolver::await_handle_on_chain）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleRefreshConfig {
    pub max_attempts: u32,
    /// 基础延迟（毫秒），渐进式增长
    pub base_delay_ms: u64,
    /// 单次延迟上限（毫秒）
    pub delay_cap_ms: u64,
    /// 渐进系数：delay_i = base * (1 + i * growth_factor)
    pub growth_factor: f64,
}

/// 写确认轮询配置（WriteConfirmationPoller）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    pub max_attempts: u32,
    pub interval_ms: u64,
}

/// 索引器端点配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: std::env::var("CHAINSYNC_VERIFY_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30_000),
            interval_ms: std::env::var("CHAINSYNC_VERIFY_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(500),
        }
    }
}

impl Default for HandleRefreshConfig {
    fn default() -> Self {
        Self {
            max_attempts: std::env::var("CHAINSYNC_HANDLE_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(15),
            base_delay_ms: std::env::var("CHAINSYNC_HANDLE_BASE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1_000),
            delay_cap_ms: std::env::var("CHAINSYNC_HANDLE_DELAY_CAP_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5_000),
            growth_factor: std::env::var("CHAINSYNC_HANDLE_GROWTH_FACTOR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.3),
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        // 默认 40 * 1500ms = 60 秒确认预算，索引器延迟与环境相关
        Self {
            max_attempts: std::env::var("CHAINSYNC_CONFIRM_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(40),
            interval_ms: std::env::var("CHAINSYNC_CONFIRM_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1_500),
        }
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("CHAINSYNC_INDEXER_URL")
                .unwrap_or_else(|_| "http://localhost:4000".to_string()),
            request_timeout_secs: std::env::var("CHAINSYNC_INDEXER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            connect_timeout_secs: std::env::var("CHAINSYNC_INDEXER_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("CHAINSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("CHAINSYNC_LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            verification: VerificationConfig::default(),
            handle_refresh: HandleRefreshConfig::default(),
            confirmation: ConfirmationConfig::default(),
            indexer: IndexerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SyncConfig {
    /// 加载配置（.env 文件 + 环境变量）并校验
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// 校验配置：所有预算必须有限且非零
    pub fn validate(&self) -> Result<()> {
        if self.verification.timeout_ms == 0 || self.verification.interval_ms == 0 {
            bail!("verification budget must be non-zero");
        }
        if self.handle_refresh.max_attempts == 0 {
            bail!("handle refresh attempt budget must be non-zero");
        }
        if self.handle_refresh.base_delay_ms > self.handle_refresh.delay_cap_ms {
            bail!(
                "handle refresh base delay ({}ms) exceeds cap ({}ms)",
                self.handle_refresh.base_delay_ms,
                self.handle_refresh.delay_cap_ms
            );
        }
        if self.handle_refresh.growth_factor < 0.0 {
            bail!("handle refresh growth factor must be non-negative");
        }
        if self.confirmation.max_attempts == 0 || self.confirmation.interval_ms == 0 {
            bail!("confirmation budget must be non-zero");
        }
        if self.indexer.base_url.is_empty() {
            bail!("indexer base_url must not be empty");
        }
        Ok(())
    }
}

impl HandleRefreshConfig {
    /// 构造渐进延迟重试策略：前几次近乎立即，之后逐渐耐心
    /// （多数切换在 1-2 秒内落定，同时避免连续敲打钱包扩展）
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: DelayStrategy::Progressive {
                base: Duration::from_millis(self.base_delay_ms),
                growth: self.growth_factor,
                cap: Duration::from_millis(self.delay_cap_ms),
            },
        }
    }
}

impl ConfirmationConfig {
    /// 构造固定间隔重试策略
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: DelayStrategy::Fixed(Duration::from_millis(self.interval_ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let config = SyncConfig::default();
        assert_eq!(config.verification.timeout_ms, 30_000);
        assert_eq!(config.verification.interval_ms, 500);
        assert_eq!(config.handle_refresh.max_attempts, 15);
        assert_eq!(config.confirmation.max_attempts, 40);
        assert_eq!(config.confirmation.interval_ms, 1_500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let mut config = SyncConfig::default();
        config.confirmation.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_base_over_cap() {
        let mut config = SyncConfig::default();
        config.handle_refresh.base_delay_ms = 10_000;
        config.handle_refresh.delay_cap_ms = 5_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_confirmation_policy_total_budget() {
        let config = ConfirmationConfig {
            max_attempts: 40,
            interval_ms: 1_500,
        };
        let policy = config.policy();
        assert_eq!(policy.max_attempts, 40);
        // 40 次尝试之间有 39 个间隔
        assert_eq!(policy.total_delay_budget(), Duration::from_millis(39 * 1_500));
    }
}
