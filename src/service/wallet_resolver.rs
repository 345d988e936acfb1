//! 钱包客户端解析器
//!
//! 持有并刷新当前钱包连接句柄。句柄在用户于钱包扩展里切换网络的
//! 瞬间就可能悄然过期，因此读取方必须通过 refresh()/current_handle()
//! 重新获取，而不是跨 await 缓存。

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::WalletClientHandle;
use crate::error::SyncError;
use crate::infrastructure::retry::{RetryOutcome, RetryPolicy};

/// 钱包集成的底层查询接口
///
/// `fetch_handle` 返回 Ok(None) 表示当前没有连接账户；
/// 返回 Err 表示刷新机制本身出错（扩展断连等），调用方视为致命。
#[async_trait]
pub trait WalletGateway: Send + Sync {
    async fn fetch_handle(&self) -> Result<Option<WalletClientHandle>>;
}

struct ResolverState {
    handle: Option<WalletClientHandle>,
    /// 每完成一次真实刷新递增，用于并发去重
    refresh_epoch: u64,
}

/// 钱包客户端解析器（句柄的单一写者）
pub struct WalletClientResolver {
    gateway: Arc<dyn WalletGateway>,
    state: Mutex<ResolverState>,
    refresh_lock: Mutex<()>,
}

impl WalletClientResolver {
    pub fn new(gateway: Arc<dyn WalletGateway>) -> Self {
        Self {
            gateway,
            state: Mutex::new(ResolverState {
                handle: None,
                refresh_epoch: 0,
            }),
            refresh_lock: Mutex::new(()),
        }
    }

    /// 返回最近一次已知的句柄，不触发刷新
    pub async fn current_handle(&self) -> Option<WalletClientHandle> {
        self.state.lock().await.handle.clone()
    }

    /// 强制向钱包集成重新获取句柄
    ///
    /// 可重入安全：并发调用共享同一次在途刷新。等待 refresh_lock 期间
    /// 若别的调用方已完成刷新（epoch 前进），直接复用其结果，
    /// 不再向钱包扩展发起重复查询。
    pub async fn refresh(&self) -> Result<Option<WalletClientHandle>, SyncError> {
        let epoch_before = self.state.lock().await.refresh_epoch;

        let _guard = self.refresh_lock.lock().await;
        {
            let state = self.state.lock().await;
            if state.refresh_epoch != epoch_before {
                tracing::debug!("refresh already completed by concurrent caller, reusing result");
                return Ok(state.handle.clone());
            }
        }

        crate::metrics::inc_handle_refresh();

        let fetched = self
            .gateway
            .fetch_handle()
            .await
            .map_err(|source| SyncError::WalletUnavailable { source })?;

        let mut state = self.state.lock().await;
        state.handle = fetched.clone();
        state.refresh_epoch += 1;

        tracing::debug!(
            chain_id = fetched.as_ref().map(|h| h.chain_id),
            connected = fetched.is_some(),
            "wallet handle refreshed"
        );

        Ok(fetched)
    }

    /// 反复刷新直到句柄绑定到目标链，或尝试预算耗尽
    ///
    /// "句柄还没到目标链"是切换期间的正常路径，不是错误；
    /// 耗尽返回 Ok(false)，是否致命由调用方决定。
    /// 只有刷新机制本身出错（WalletUnavailable）才返回 Err。
    pub async fn await_handle_on_chain(
        &self,
        target_id: u64,
        policy: &RetryPolicy,
    ) -> Result<bool, SyncError> {
        let outcome = policy
            .run(|attempt| async move {
                match self.refresh().await {
                    Ok(Some(handle)) if handle.is_on_chain(target_id) => {
                        tracing::debug!(
                            target_id,
                            attempt = attempt + 1,
                            "wallet handle now bound to target chain"
                        );
                        Some(Ok(()))
                    }
                    Ok(handle) => {
                        tracing::debug!(
                            target_id,
                            current = handle.map(|h| h.chain_id),
                            attempt = attempt + 1,
                            "wallet handle not yet on target chain"
                        );
                        None
                    }
                    Err(e) => Some(Err(e)),
                }
            })
            .await;

        match outcome {
            RetryOutcome::Completed(Ok(())) => Ok(true),
            RetryOutcome::Completed(Err(e)) => Err(e),
            RetryOutcome::Exhausted => {
                tracing::warn!(
                    target_id,
                    max_attempts = policy.max_attempts,
                    "wallet handle did not rebind to target chain within attempt budget"
                );
                Ok(false)
            }
        }
    }
}
