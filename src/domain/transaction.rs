//! 同步过程中的瞬态数据模型
//!
//! 钱包句柄、交易引用、切换尝试结果与确认轮询状态。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 钱包客户端句柄：代表"以当前连接账户签名/提交"的能力快照
///
/// 所有权属于 WalletClientResolver（单写者）；其他组件只在单次操作内
/// 借用，禁止跨 await 缓存——用户随时可能在钱包扩展里切换网络，
/// 缓存的句柄会在无任何通知的情况下变陈旧。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletClientHandle {
    /// 连接账户地址
    pub account: String,
    /// 句柄自认为绑定的链 ID（可能滞后于钱包扩展的真实状态）
    pub chain_id: u64,
    /// 获取时间
    pub acquired_at: DateTime<Utc>,
}

impl WalletClientHandle {
    pub fn new(account: impl Into<String>, chain_id: u64) -> Self {
        Self {
            account: account.into(),
            chain_id,
            acquired_at: Utc::now(),
        }
    }

    /// 句柄是否声称绑定在目标链上
    pub fn is_on_chain(&self, target_id: u64) -> bool {
        self.chain_id == target_id
    }
}

/// 交易引用：写入被账本接受后返回的标识符 + 提交所在链
///
/// 构造后不可变（私有字段，只读访问器）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReference {
    tx_hash: String,
    chain_id: u64,
}

impl TransactionReference {
    /// 构造并校验交易引用
    pub fn new(tx_hash: impl Into<String>, chain_id: u64) -> anyhow::Result<Self> {
        let tx_hash = tx_hash.into();

        if !tx_hash.starts_with("0x") {
            anyhow::bail!("invalid transaction hash format: must start with 0x");
        }
        if tx_hash.len() < 10 {
            anyhow::bail!("invalid transaction hash: too short");
        }
        hex::decode(tx_hash.trim_start_matches("0x"))
            .map_err(|e| anyhow::anyhow!("invalid transaction hash hex: {}", e))?;

        Ok(Self { tx_hash, chain_id })
    }

    pub fn tx_hash(&self) -> &str {
        &self.tx_hash
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

impl std::fmt::Display for TransactionReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.tx_hash, self.chain_id)
    }
}

/// 切换方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchMethod {
    /// 主策略：异步切换调用，等待钱包扩展确认后才 resolve
    Primary,
    /// 钱包客户端自带的切换能力
    WalletClient,
    /// 遗留的 fire-and-forget 调用，成功与否不可信，必须独立验证
    Legacy,
}

impl SwitchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchMethod::Primary => "primary",
            SwitchMethod::WalletClient => "wallet_client",
            SwitchMethod::Legacy => "legacy",
        }
    }
}

/// 单次切换尝试的结果。不持久化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchAttemptResult {
    pub succeeded: bool,
    pub method_used: SwitchMethod,
    pub error: Option<String>,
}

/// 确认结果
///
/// TimedOut 明确不等于"写入失败"：链上写入已经成功，
/// 只是索引器的下游反映没有在预算内被观察到。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationOutcome {
    Confirmed,
    TimedOut,
}

/// 确认轮询状态机
///
/// 轮询开始时创建，只由 WriteConfirmationPoller 变更，resolve 后即弃。
#[derive(Debug, Clone)]
pub struct ConfirmationState {
    reference: TransactionReference,
    attempts_remaining: u32,
    resolved: bool,
    outcome: Option<ConfirmationOutcome>,
}

impl ConfirmationState {
    pub(crate) fn new(reference: TransactionReference, attempt_budget: u32) -> Self {
        Self {
            reference,
            attempts_remaining: attempt_budget,
            resolved: false,
            outcome: None,
        }
    }

    pub(crate) fn record_attempt(&mut self) {
        self.attempts_remaining = self.attempts_remaining.saturating_sub(1);
    }

    pub(crate) fn resolve(&mut self, outcome: ConfirmationOutcome) {
        self.resolved = true;
        self.outcome = Some(outcome);
    }

    pub fn reference(&self) -> &TransactionReference {
        &self.reference
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn outcome(&self) -> Option<ConfirmationOutcome> {
        self.outcome
    }
}
