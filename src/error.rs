//! 错误类型定义
//!
//! 分类原则：单次轮询迭代内部的瞬时错误在循环内恢复（记日志后继续），
//! 耗尽重试预算的错误才转换为下列错误类别抛给编排方。
//! 确认超时不在此列——链上写入本身已成功，只是索引器尚未反映，
//! 它以 `ConfirmationOutcome::TimedOut` 的形式在类型上与提交失败区分开。

use thiserror::Error;

/// 网络同步错误分类
#[derive(Debug, Error)]
pub enum SyncError {
    /// 目标链不在支持目录中。立即失败，不重试
    #[error("unsupported chain: {chain_id}")]
    UnsupportedChain { chain_id: u64 },

    /// 所有切换策略都抛错。携带最后一个策略的错误
    #[error("all switch strategies failed for chain {chain_id}")]
    SwitchFailed {
        chain_id: u64,
        #[source]
        source: anyhow::Error,
    },

    /// 策略没有报错但验证器在预算内没有观察到目标链。
    /// 与 SwitchFailed 区分：钱包可能静默忽略了请求（典型场景：
    /// 用户直接关掉了钱包弹窗而没有产生显式拒绝错误）
    #[error("switch to chain {chain_id} was not confirmed within {timeout_ms}ms")]
    SwitchNotConfirmed { chain_id: u64, timeout_ms: u64 },

    /// 钱包连接本身已断开。本层不可重试
    #[error("wallet connection unavailable")]
    WalletUnavailable {
        #[source]
        source: anyhow::Error,
    },
}

impl SyncError {
    /// 稳定错误码（snake_case），供调用方做用户提示映射
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::UnsupportedChain { .. } => "chain_not_supported",
            SyncError::SwitchFailed { .. } => "switch_failed",
            SyncError::SwitchNotConfirmed { .. } => "switch_not_confirmed",
            SyncError::WalletUnavailable { .. } => "wallet_unavailable",
        }
    }

    /// 整个操作是否值得在调用方层面重试
    /// （例如提示用户手动切换后重来一遍）
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::UnsupportedChain { .. } => false,
            SyncError::SwitchFailed { .. } => true,
            SyncError::SwitchNotConfirmed { .. } => true,
            SyncError::WalletUnavailable { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_stable() {
        let err = SyncError::UnsupportedChain { chain_id: 999 };
        assert_eq!(err.code(), "chain_not_supported");

        let err = SyncError::SwitchNotConfirmed {
            chain_id: 10,
            timeout_ms: 30_000,
        };
        assert_eq!(err.code(), "switch_not_confirmed");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_wallet_unavailable_not_retryable() {
        let err = SyncError::WalletUnavailable {
            source: anyhow::anyhow!("extension disconnected"),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.code(), "wallet_unavailable");
    }

    #[test]
    fn test_switch_failed_carries_source() {
        let err = SyncError::SwitchFailed {
            chain_id: 10,
            source: anyhow::anyhow!("user rejected"),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("chain 10"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
