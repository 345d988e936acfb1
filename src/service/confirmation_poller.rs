//! 写确认轮询器
//!
//! 链上写入已被账本接受（交易哈希存在）之后，轮询外部索引器
//! 直到其读模型反映该写入，或尝试预算耗尽。
//! 超时不等于写入失败：只是索引器的下游反映还没被观察到，
//! 调用方应以"稍后才会显示为完成"的口径呈现，而不是报错。

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{ConfirmationOutcome, ConfirmationState, TransactionReference};
use crate::infrastructure::retry::{RetryOutcome, RetryPolicy};

/// 确认检查：索引器的读模型是否已反映该写入
///
/// 网络错误返回 Err——会被轮询循环吞掉、记日志并重试，
/// 索引器的瞬时抖动绝不能中止确认。
#[async_trait]
pub trait ConfirmationCheck: Send + Sync {
    async fn is_reflected(&self, reference: &TransactionReference) -> Result<bool>;
}

/// 轮询开始前的索引器通知（fire-and-forget）
///
/// 失败只记日志，确认轮询不以通知成功为前提。
#[async_trait]
pub trait IndexerNotifier: Send + Sync {
    async fn notify_write_landed(&self, reference: &TransactionReference) -> Result<()>;
}

/// 写确认轮询器
pub struct WriteConfirmationPoller {
    checker: Arc<dyn ConfirmationCheck>,
    policy: RetryPolicy,
    /// 轮询前的索引器通知，用于催促更快的索引
    notifier: Option<Arc<dyn IndexerNotifier>>,
}

impl WriteConfirmationPoller {
    /// 默认预算：40 次 * 1500ms = 60 秒
    pub fn new(checker: Arc<dyn ConfirmationCheck>) -> Self {
        Self {
            checker,
            policy: RetryPolicy::fixed(40, std::time::Duration::from_millis(1_500)),
            notifier: None,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_indexer_notification(mut self, notifier: Arc<dyn IndexerNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// 轮询直到写入被索引器反映（Confirmed）或预算耗尽（TimedOut）
    pub async fn await_confirmation(
        &self,
        reference: &TransactionReference,
    ) -> ConfirmationOutcome {
        self.await_confirmation_state(reference)
            .await
            .outcome()
            .unwrap_or(ConfirmationOutcome::TimedOut)
    }

    /// 同 await_confirmation，额外返回完整的轮询状态（剩余尝试数等）
    pub async fn await_confirmation_state(
        &self,
        reference: &TransactionReference,
    ) -> ConfirmationState {
        // 先捅一下索引器；只关心"没有抛错"，抛错也只记日志
        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify_write_landed(reference).await {
                tracing::debug!(
                    reference = %reference,
                    error = ?e,
                    "attestation listener notification failed, polling continues"
                );
            }
        }

        let polls = AtomicU32::new(0);
        let outcome = self
            .policy
            .run(|attempt| {
                let polls = &polls;
                async move {
                    polls.fetch_add(1, Ordering::SeqCst);
                    crate::metrics::inc_confirmation_poll();

                    match self.checker.is_reflected(reference).await {
                        Ok(true) => Some(()),
                        Ok(false) => {
                            tracing::debug!(
                                reference = %reference,
                                attempt = attempt + 1,
                                "write not yet reflected by indexer"
                            );
                            None
                        }
                        Err(e) => {
                            // 瞬时查询错误：吞掉并重试
                            tracing::debug!(
                                reference = %reference,
                                attempt = attempt + 1,
                                error = ?e,
                                "indexer query failed, will retry"
                            );
                            None
                        }
                    }
                }
            })
            .await;

        let mut state = ConfirmationState::new(reference.clone(), self.policy.max_attempts);
        for _ in 0..polls.load(Ordering::SeqCst) {
            state.record_attempt();
        }

        match outcome {
            RetryOutcome::Completed(()) => {
                state.resolve(ConfirmationOutcome::Confirmed);
                crate::metrics::inc_confirmation_confirmed();
                tracing::info!(
                    reference = %reference,
                    attempts_used = polls.load(Ordering::SeqCst),
                    attempts_remaining = state.attempts_remaining(),
                    "write confirmed by indexer"
                );
            }
            RetryOutcome::Exhausted => {
                state.resolve(ConfirmationOutcome::TimedOut);
                crate::metrics::inc_confirmation_timeout();
                tracing::warn!(
                    reference = %reference,
                    max_attempts = self.policy.max_attempts,
                    "confirmation polling exhausted; on-chain write succeeded, indexer reflection pending"
                );
            }
        }

        state
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    /// 第 N 次查询开始返回 true 的模拟检查器（0 表示永不）
    struct ReflectAfter {
        reflect_on_call: u32,
        calls: AtomicU32,
    }

    impl ReflectAfter {
        fn new(reflect_on_call: u32) -> Arc<Self> {
            Arc::new(Self {
                reflect_on_call,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl ConfirmationCheck for ReflectAfter {
        async fn is_reflected(&self, _reference: &TransactionReference) -> Result<bool> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(self.reflect_on_call != 0 && call >= self.reflect_on_call)
        }
    }

    struct RecordingNotifier {
        calls: AtomicU32,
    }

    #[async_trait]
    impl IndexerNotifier for RecordingNotifier {
        async fn notify_write_landed(&self, _reference: &TransactionReference) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct UnreachableNotifier;

    #[async_trait]
    impl IndexerNotifier for UnreachableNotifier {
        async fn notify_write_landed(&self, _reference: &TransactionReference) -> Result<()> {
            anyhow::bail!("attestation listener unreachable")
        }
    }

    struct FlakyThenReflect {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ConfirmationCheck for FlakyThenReflect {
        async fn is_reflected(&self, _reference: &TransactionReference) -> Result<bool> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == 1 {
                anyhow::bail!("indexer hiccup");
            }
            Ok(true)
        }
    }

    fn reference() -> TransactionReference {
        TransactionReference::new("0xabcdef0123456789", 10).unwrap()
    }

    #[tokio::test]
    async fn test_bounded_retries_then_timeout() {
        let checker = ReflectAfter::new(0);
        let poller = WriteConfirmationPoller::new(checker.clone())
            .with_policy(RetryPolicy::fixed(3, Duration::from_millis(10)));

        let start = Instant::now();
        let outcome = poller.await_confirmation(&reference()).await;

        assert_eq!(outcome, ConfirmationOutcome::TimedOut);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_early_exit_on_confirmation() {
        let checker = ReflectAfter::new(2);
        let poller = WriteConfirmationPoller::new(checker.clone())
            .with_policy(RetryPolicy::fixed(5, Duration::from_millis(10)));

        let outcome = poller.await_confirmation(&reference()).await;

        assert_eq!(outcome, ConfirmationOutcome::Confirmed);
        // 第 2 次查询命中后不再发出第 3 次
        assert_eq!(checker.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_state_tracks_attempt_budget() {
        let checker = ReflectAfter::new(2);
        let poller = WriteConfirmationPoller::new(checker)
            .with_policy(RetryPolicy::fixed(5, Duration::from_millis(10)));

        let state = poller.await_confirmation_state(&reference()).await;

        assert!(state.is_resolved());
        assert_eq!(state.outcome(), Some(ConfirmationOutcome::Confirmed));
        assert_eq!(state.attempts_remaining(), 3);
        assert_eq!(state.reference().chain_id(), 10);
    }

    #[tokio::test]
    async fn test_notification_sent_once_before_polling() {
        let notifier = Arc::new(RecordingNotifier {
            calls: AtomicU32::new(0),
        });
        let checker = ReflectAfter::new(1);
        let poller = WriteConfirmationPoller::new(checker)
            .with_policy(RetryPolicy::fixed(3, Duration::from_millis(10)))
            .with_indexer_notification(notifier.clone());

        let outcome = poller.await_confirmation(&reference()).await;

        assert_eq!(outcome, ConfirmationOutcome::Confirmed);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_affect_polling() {
        let checker = ReflectAfter::new(2);
        let poller = WriteConfirmationPoller::new(checker.clone())
            .with_policy(RetryPolicy::fixed(5, Duration::from_millis(10)))
            .with_indexer_notification(Arc::new(UnreachableNotifier));

        let outcome = poller.await_confirmation(&reference()).await;

        assert_eq!(outcome, ConfirmationOutcome::Confirmed);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transient_query_error_is_swallowed() {
        let checker = Arc::new(FlakyThenReflect {
            calls: AtomicU32::new(0),
        });
        let poller = WriteConfirmationPoller::new(checker.clone())
            .with_policy(RetryPolicy::fixed(5, Duration::from_millis(10)));

        let outcome = poller.await_confirmation(&reference()).await;

        assert_eq!(outcome, ConfirmationOutcome::Confirmed);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 2);
    }
}
