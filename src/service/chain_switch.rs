//! 链切换协调器
//!
//! 单次 ensure_network 调用的状态机：
//! IDLE -> ALREADY_CORRECT（终态，成功）
//!      -> SWITCHING -> VERIFYING -> REFRESHING_CLIENT -> DONE（终态，成功）
//!                   -> FAILED（终态，失败）
//!
//! 切换请求必须串行：多数钱包扩展无法处理并发的切换弹窗，
//! 会排队或直接拒绝。同目标的并发调用在锁后重查当前链，
//! 坍缩到同一次生效的切换上。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::domain::{NetworkCatalog, NetworkDescriptor, SwitchAttemptResult, SwitchMethod};
use crate::error::SyncError;
use crate::infrastructure::retry::RetryPolicy;
use crate::service::chain_verifier::ChainVerifier;
use crate::service::wallet_resolver::WalletClientResolver;
use crate::utils::format_chain_id_hex;

/// 策略层错误：不可用（跳到下一个策略）或执行失败（记录后尝试下一个）
#[derive(Debug)]
pub enum StrategyError {
    /// 当前环境不提供该策略（例如钱包客户端没有暴露切换能力）
    Unavailable,
    Failed(anyhow::Error),
}

/// 一种具体的"请求钱包切换网络"的方法
///
/// 统一契约：成功返回 Ok(())。成功与否最终都要经过独立验证——
/// 遗留策略（Legacy）的成功返回尤其不可信。
#[async_trait]
pub trait SwitchStrategy: Send + Sync {
    fn method(&self) -> SwitchMethod;

    /// 请求切换到目标网络。可能弹出钱包扩展的确认 UI
    async fn request_switch(&self, target: &NetworkDescriptor) -> Result<(), StrategyError>;
}

/// 切换过程的策略参数
#[derive(Debug, Clone)]
pub struct SwitchPolicy {
    /// 验证预算
    pub verify_timeout: Duration,
    /// 句柄重绑定的重试策略
    pub handle_refresh: RetryPolicy,
}

impl SwitchPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            verify_timeout: Duration::from_millis(config.verification.timeout_ms),
            handle_refresh: config.handle_refresh.policy(),
        }
    }
}

impl Default for SwitchPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// 链切换协调器
pub struct ChainSwitchCoordinator {
    catalog: Arc<NetworkCatalog>,
    strategies: Vec<Arc<dyn SwitchStrategy>>,
    verifier: ChainVerifier,
    resolver: Arc<WalletClientResolver>,
    reactive_chain: watch::Receiver<Option<u64>>,
    policy: SwitchPolicy,
    /// 串行化切换尝试
    switch_lock: Mutex<()>,
    /// 最近一次成功切换到的链。仅供诊断/幂等参考，不作为权威状态
    last_switched: Mutex<Option<u64>>,
    /// 最近一次切换中各策略的尝试记录（诊断用）
    last_attempts: Mutex<Vec<SwitchAttemptResult>>,
}

impl ChainSwitchCoordinator {
    pub fn new(
        catalog: Arc<NetworkCatalog>,
        strategies: Vec<Arc<dyn SwitchStrategy>>,
        verifier: ChainVerifier,
        resolver: Arc<WalletClientResolver>,
        reactive_chain: watch::Receiver<Option<u64>>,
        policy: SwitchPolicy,
    ) -> Self {
        Self {
            catalog,
            strategies,
            verifier,
            resolver,
            reactive_chain,
            policy,
            switch_lock: Mutex::new(()),
            last_switched: Mutex::new(None),
            last_attempts: Mutex::new(Vec::new()),
        }
    }

    fn current_chain(&self) -> Option<u64> {
        *self.reactive_chain.borrow()
    }

    /// 确保钱包处于目标网络
    ///
    /// 已在目标网络时是廉价无副作用的 no-op。
    pub async fn ensure_network(&self, target_id: u64) -> Result<(), SyncError> {
        let descriptor = self
            .catalog
            .describe(target_id)
            .cloned()
            .ok_or(SyncError::UnsupportedChain { chain_id: target_id })?;

        // ALREADY_CORRECT：零策略调用、零验证轮询
        if self.current_chain() == Some(target_id) {
            tracing::debug!(target_id, "already on target chain, nothing to do");
            return Ok(());
        }

        let _guard = self.switch_lock.lock().await;

        // 等锁期间前一个调用方可能已完成同一目标的切换
        if self.current_chain() == Some(target_id) {
            tracing::debug!(target_id, "target chain reached while waiting for switch lock");
            return Ok(());
        }

        let op_id = Uuid::new_v4();
        crate::metrics::inc_switch_request();

        tracing::info!(
            op_id = %op_id,
            target_id,
            target_hex = %format_chain_id_hex(target_id),
            network = %descriptor.name,
            current = self.current_chain(),
            "starting network switch"
        );

        // SWITCHING：按序尝试策略，不并行
        let attempt = self.try_strategies(&descriptor, op_id).await?;

        // VERIFYING：策略成功不可尽信，必须独立观察到目标链
        let verified = self
            .verifier
            .verify_active_chain(target_id, self.policy.verify_timeout)
            .await;

        if !verified {
            crate::metrics::inc_switch_failed();
            tracing::warn!(
                op_id = %op_id,
                target_id,
                method = attempt.method_used.as_str(),
                "switch request was accepted but target chain never observed"
            );
            return Err(SyncError::SwitchNotConfirmed {
                chain_id: target_id,
                timeout_ms: self.policy.verify_timeout.as_millis() as u64,
            });
        }

        // REFRESHING_CLIENT：句柄重绑定失败不致命——下一步的写入
        // 自己会以可区分的方式报错，在这里硬失败反而会中止
        // 本可以成功的操作
        match self
            .resolver
            .await_handle_on_chain(target_id, &self.policy.handle_refresh)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    op_id = %op_id,
                    target_id,
                    "wallet handle refresh exhausted, continuing anyway"
                );
            }
            Err(e) => return Err(e),
        }

        // DONE
        *self.last_switched.lock().await = Some(target_id);
        crate::metrics::inc_switch_success();

        tracing::info!(
            op_id = %op_id,
            target_id,
            method = attempt.method_used.as_str(),
            "network switch completed"
        );

        Ok(())
    }

    /// 按序尝试切换策略：第一个成功者胜出，全部失败时携带最后的错误。
    /// 每次真实尝试（成功或失败）各留一条记录，不可用的策略不算尝试
    async fn try_strategies(
        &self,
        target: &NetworkDescriptor,
        op_id: Uuid,
    ) -> Result<SwitchAttemptResult, SyncError> {
        let mut attempts: Vec<SwitchAttemptResult> = Vec::new();
        let mut last_error: Option<anyhow::Error> = None;

        for strategy in &self.strategies {
            let method = strategy.method();
            match strategy.request_switch(target).await {
                Ok(()) => {
                    tracing::info!(
                        op_id = %op_id,
                        target_id = target.id,
                        method = method.as_str(),
                        "switch strategy accepted"
                    );
                    let record = SwitchAttemptResult {
                        succeeded: true,
                        method_used: method,
                        error: None,
                    };
                    attempts.push(record.clone());
                    *self.last_attempts.lock().await = attempts;
                    return Ok(record);
                }
                Err(StrategyError::Unavailable) => {
                    tracing::debug!(
                        op_id = %op_id,
                        method = method.as_str(),
                        "switch strategy unavailable, trying next"
                    );
                }
                Err(StrategyError::Failed(e)) => {
                    crate::metrics::inc_switch_strategy_fallback();
                    tracing::warn!(
                        op_id = %op_id,
                        method = method.as_str(),
                        error = ?e,
                        "switch strategy failed, trying next"
                    );
                    attempts.push(SwitchAttemptResult {
                        succeeded: false,
                        method_used: method,
                        error: Some(e.to_string()),
                    });
                    last_error = Some(e);
                }
            }
        }

        tracing::warn!(
            op_id = %op_id,
            target_id = target.id,
            attempts = ?attempts,
            "all switch strategies exhausted"
        );
        *self.last_attempts.lock().await = attempts;

        crate::metrics::inc_switch_failed();
        Err(SyncError::SwitchFailed {
            chain_id: target.id,
            source: last_error
                .unwrap_or_else(|| anyhow::anyhow!("no switch strategy available")),
        })
    }

    /// 最近一次成功切换到的链（诊断用）
    pub async fn last_switched_chain(&self) -> Option<u64> {
        *self.last_switched.lock().await
    }

    /// 最近一次切换的逐策略尝试记录（诊断用）
    pub async fn last_attempt_records(&self) -> Vec<SwitchAttemptResult> {
        self.last_attempts.lock().await.clone()
    }
}
