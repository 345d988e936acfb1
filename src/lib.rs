//! ChainSync - 钱包网络状态同步与写确认轮询
//!
//! 协调三个互相独立、最终一致的状态机：钱包扩展当前选中的网络、
//! 调用方缓存的钱包句柄、以及索引器对链上写入的读模型。
//! 三者之间没有任何一方能向其他方推送状态，所有同步都靠轮询、
//! 有界重试和多级回退策略完成。

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod metrics;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use error::SyncError;

// 统一模块导出
pub mod prelude {
    pub use crate::{
        config::SyncConfig,
        domain::{
            ConfirmationOutcome, NetworkCatalog, NetworkDescriptor, SwitchMethod,
            TransactionReference, WalletClientHandle,
        },
        error::SyncError,
        infrastructure::retry::{DelayStrategy, RetryOutcome, RetryPolicy},
        service::{
            ChainProbe, ChainSwitchCoordinator, ChainVerifier, ConfirmationCheck,
            SwitchStrategy, WalletClientResolver, WalletGateway, WriteConfirmationPoller,
        },
    };
}
