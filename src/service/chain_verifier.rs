//! 链验证器
//!
//! 判断钱包真正激活的网络是否等于目标网络。依赖两个独立信号：
//! (1) 调用方上下文维护的响应式链 ID——便宜，但可能被渲染周期拖慢；
//! (2) 对钱包底层 provider 的直接查询——权威，但偶发失败（扩展忙）。
//! 只用其中一个信号在实践里会产生假阴性，所以任一信号命中即判定成功。

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use tokio::sync::watch;

use crate::domain::NetworkDescriptor;
use crate::infrastructure::retry::{RetryOutcome, RetryPolicy};

/// 对钱包 provider 的窄接口：查询当前激活链
///
/// 核心逻辑只依赖这个形状，不关心宿主环境实际暴露的对象长什么样。
#[async_trait]
pub trait ChainProbe: Send + Sync {
    async fn query_active_chain(&self) -> Result<u64>;
}

/// 基于 EVM JSON-RPC 的探针实现（eth_chainId）
pub struct RpcChainProbe {
    provider: Provider<Http>,
}

impl RpcChainProbe {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("invalid rpc url: {}", rpc_url))?;
        Ok(Self { provider })
    }

    pub fn for_network(descriptor: &NetworkDescriptor) -> Result<Self> {
        Self::new(&descriptor.rpc_endpoint)
    }
}

#[async_trait]
impl ChainProbe for RpcChainProbe {
    async fn query_active_chain(&self) -> Result<u64> {
        let chain_id = self
            .provider
            .get_chainid()
            .await
            .context("eth_chainId query failed")?;
        Ok(chain_id.as_u64())
    }
}

/// 链验证器
pub struct ChainVerifier {
    reactive_chain: watch::Receiver<Option<u64>>,
    probe: Option<Arc<dyn ChainProbe>>,
    poll_interval: Duration,
}

impl ChainVerifier {
    pub fn new(
        reactive_chain: watch::Receiver<Option<u64>>,
        probe: Option<Arc<dyn ChainProbe>>,
    ) -> Self {
        Self {
            reactive_chain,
            probe,
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// 在 timeout 预算内轮询，观察到目标链即返回 true，超时返回 false
    pub async fn verify_active_chain(&self, target_id: u64, timeout: Duration) -> bool {
        let interval_ms = self.poll_interval.as_millis().max(1) as u64;
        let attempts = (timeout.as_millis() as u64 / interval_ms).max(1) as u32;
        let policy = RetryPolicy::fixed(attempts, self.poll_interval);

        let outcome = policy
            .run(|attempt| async move {
                crate::metrics::inc_verify_poll();

                // 信号一：响应式链 ID
                if *self.reactive_chain.borrow() == Some(target_id) {
                    tracing::debug!(
                        target_id,
                        attempt = attempt + 1,
                        "reactive chain id matches target"
                    );
                    return Some(());
                }

                // 信号二：直连 provider 探针。查询失败只记日志并跳过，
                // 不能让一次探针失败中止整个验证
                if let Some(probe) = &self.probe {
                    match probe.query_active_chain().await {
                        Ok(chain_id) if chain_id == target_id => {
                            tracing::debug!(
                                target_id,
                                attempt = attempt + 1,
                                "provider probe confirms target chain"
                            );
                            return Some(());
                        }
                        Ok(chain_id) => {
                            tracing::debug!(
                                target_id,
                                probed = chain_id,
                                attempt = attempt + 1,
                                "provider probe reports different chain"
                            );
                        }
                        Err(e) => {
                            tracing::debug!(
                                error = ?e,
                                attempt = attempt + 1,
                                "provider probe query failed, skipping this signal"
                            );
                        }
                    }
                }

                None
            })
            .await;

        match outcome {
            RetryOutcome::Completed(()) => true,
            RetryOutcome::Exhausted => {
                tracing::warn!(
                    target_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "active chain verification timed out"
                );
                false
            }
        }
    }
}
